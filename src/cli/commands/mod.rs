mod migrate;
mod user;

pub use migrate::{cmd_migrate_down, cmd_migrate_fresh, cmd_migrate_status, cmd_migrate_up};
pub use user::{
    cmd_user_add, cmd_user_list, cmd_user_passwd, cmd_user_remove, cmd_user_rotate_key,
    cmd_user_verify_key, cmd_user_verify_password,
};
