#![allow(dead_code)]

use picter_core::{Db, DbConfig, NewImage, NewUser};
use uuid::Uuid;

/// Config for a private in-memory store that no other test shares.
pub fn memory_config() -> DbConfig {
    DbConfig::default()
        .with_host(format!("test-{}", Uuid::new_v4().simple()))
        .with_db(format!("picter_{}", Uuid::new_v4().simple()))
}

pub async fn connected_db() -> Db {
    let mut db = Db::new(memory_config());
    db.connect().await.unwrap();
    db
}

pub fn image_fixture() -> NewImage {
    image_for(&Uuid::new_v4().to_string())
}

pub fn image_for(user_id: &str) -> NewImage {
    NewImage::new(
        "Disfrutando en #holidays con #family es #awesome",
        format!("https://picter.test/{}.jpg", Uuid::new_v4().simple()),
        user_id,
    )
}

pub fn user_fixture() -> NewUser {
    let suffix = Uuid::new_v4().simple().to_string();
    NewUser::new(
        format!("user_{suffix}"),
        "foo123",
        format!("{suffix}@picter.test"),
        "Freddy Vega",
    )
}
