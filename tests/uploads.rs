use std::path::PathBuf;

use axum::http::StatusCode;
use greencart_api::storage::{FileStore, UploadKind, is_stored_name};
use uuid::Uuid;

const MAX_BYTES: usize = 1024;

fn temp_store() -> (FileStore, PathBuf) {
    let root = std::env::temp_dir().join(format!("greencart-uploads-{}", Uuid::new_v4()));
    (FileStore::new(&root, MAX_BYTES), root)
}

#[tokio::test]
async fn stored_file_is_renamed_and_readable() -> anyhow::Result<()> {
    let (store, root) = temp_store();

    let stored = store
        .save(UploadKind::ProductImage, "Mon Panier.PNG", b"\x89PNG fake")
        .await?;
    assert!(stored.filename.ends_with(".png"));
    assert!(is_stored_name(&stored.filename, UploadKind::ProductImage));
    assert_eq!(stored.url, format!("/api/upload/product-image/{}", stored.filename));
    assert_eq!(stored.size, 9);
    assert!(store.root().join("product-images").join(&stored.filename).is_file());

    let (bytes, content_type) = store.read(UploadKind::ProductImage, &stored.filename).await?;
    assert_eq!(bytes, b"\x89PNG fake");
    assert_eq!(content_type, "image/png");

    store.delete(UploadKind::ProductImage, &stored.filename).await?;
    assert!(!store.exists(UploadKind::ProductImage, &stored.filename).await?);
    // Second delete is a no-op.
    store.delete(UploadKind::ProductImage, &stored.filename).await?;

    tokio::fs::remove_dir_all(root).await.ok();
    Ok(())
}

#[tokio::test]
async fn student_proof_accepts_pdf_but_product_image_does_not() {
    let (store, root) = temp_store();

    let proof = store
        .save(UploadKind::StudentProof, "carte.pdf", b"%PDF-1.4")
        .await
        .expect("pdf proof");
    assert!(proof.filename.ends_with(".pdf"));

    let err = store
        .save(UploadKind::ProductImage, "notice.pdf", b"%PDF-1.4")
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    tokio::fs::remove_dir_all(root).await.ok();
}

#[tokio::test]
async fn empty_and_oversized_files_are_rejected() {
    let (store, _root) = temp_store();

    let err = store
        .save(UploadKind::ProductImage, "a.jpg", b"")
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let big = vec![0u8; MAX_BYTES + 1];
    let err = store
        .save(UploadKind::ProductImage, "a.jpg", &big)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn path_traversal_names_are_rejected() {
    let (store, _root) = temp_store();

    for name in [
        "../secret.png",
        "..%2F..%2Fetc%2Fpasswd",
        "/etc/passwd",
        "not-a-uuid.png",
        "",
    ] {
        let err = store
            .read(UploadKind::ProductImage, name)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST, "name {name:?}");
    }

    let missing = format!("{}.png", Uuid::new_v4());
    let err = store
        .read(UploadKind::ProductImage, &missing)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[test]
fn stored_names_must_match_kind_extensions() {
    let id = Uuid::new_v4();
    assert!(is_stored_name(&format!("{id}.webp"), UploadKind::ProductImage));
    assert!(!is_stored_name(&format!("{id}.webp"), UploadKind::StudentProof));
    assert!(is_stored_name(&format!("{id}.pdf"), UploadKind::StudentProof));
    assert!(!is_stored_name(&format!("{id}.exe"), UploadKind::StudentProof));
}
