use shared::domain::{BucketName, ObjectKey};
use storage::Storage;

#[tokio::test]
async fn objects_survive_reopening_the_database() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("objects.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));
    let bucket = BucketName::from("frubucket");

    {
        let storage = Storage::new(&database_url).await.expect("db");
        storage
            .put_object(&bucket, &ObjectKey::from("mango.jpg"), "image/jpeg", b"mango")
            .await
            .expect("put mango");
        storage
            .put_object(&bucket, &ObjectKey::from("melon.jpg"), "image/jpeg", b"melon")
            .await
            .expect("put melon");
        storage.pool().close().await;
    }

    let reopened = Storage::new(&database_url).await.expect("reopen");
    let latest = reopened
        .latest_object(&bucket)
        .await
        .expect("latest")
        .expect("object present");
    assert_eq!(latest.summary.key.as_str(), "melon.jpg");
    assert_eq!(latest.body, b"melon");

    let next = reopened
        .put_object(&bucket, &ObjectKey::from("guava.jpg"), "image/jpeg", b"guava")
        .await
        .expect("put guava");
    assert!(next.revision > latest.summary.revision);
}
