use chatlead::db::{ChatStore, ContactStore};
use chatlead::error::ErrorKind;
use chatlead::models::{Contact, ContactStatus};
use chatlead::services::{ContactReconciler, ImportRequest};
use pretty_assertions::assert_eq;

mod common;
use common::TestEnv;

#[tokio::test]
async fn test_outlook_row_renames_imported_chat() {
    let env = TestEnv::new().await;
    let importer = env.importer().await;
    let transcript = "05/01/26, 10:30 - +54 9 261 276-7072: Hola\n";
    let archive = env.archive(
        "Chat de WhatsApp con +54 9 261 276-7072.zip",
        &[("chat.txt", transcript.as_bytes())],
    );
    let imported = importer.import_archive(ImportRequest::new(&archive, 1)).await.unwrap();

    let csv = "First Name,Last Name,Phone 1 - Value\n001 Juan Perez,,261 276 7072\n";
    let reconciler = ContactReconciler::new(env.db.clone());
    let stats = reconciler.reconcile(1, csv.as_bytes(), false).await.unwrap();

    assert_eq!(stats.rows, 1);
    assert_eq!(stats.matched_by_phone, 1);
    assert_eq!(stats.contacts_updated, 1);
    assert_eq!(stats.chats_renamed, 1);
    assert!(!stats.dry_run);

    let contact = env.db.get_contact(imported.contact_id).await.unwrap().unwrap();
    assert_eq!(contact.name, "Juan Perez");
    assert_eq!(contact.status, ContactStatus::Named);
    assert_eq!(contact.phone.as_deref(), Some("+5492612767072"));

    let chat = env.db.get_chat(imported.chat_id).await.unwrap().unwrap();
    assert_eq!(chat.name, "Juan Perez");

    // The next export of the same chat resolves to the renamed identity.
    let again = importer.import_archive(ImportRequest::new(&archive, 1)).await.unwrap();
    assert_eq!(again.chat_id, imported.chat_id);
    assert_eq!(again.contact_id, imported.contact_id);
}

#[tokio::test]
async fn test_phone_backfilled_by_one_row_matches_the_next() {
    let env = TestEnv::new().await;
    let id = env
        .db
        .create_contact(&Contact::new(1, "Maria Gomez".into(), None, ContactStatus::Named))
        .await
        .unwrap();

    let csv = "Nombre;Teléfono 1 - Valor;Teléfono 2 - Valor\n\
               Maria Gomez;261 555 1234;261 555 9999\n\
               Mari;+54 9 261 555 9999;\n";
    let stats = ContactReconciler::new(env.db.clone())
        .reconcile(1, csv.as_bytes(), false)
        .await
        .unwrap();

    assert_eq!(stats.rows, 2);
    assert_eq!(stats.matched_by_name, 1);
    assert_eq!(stats.matched_by_phone, 1);
    assert_eq!(stats.unmatched, 0);

    let contact = env.db.get_contact(id).await.unwrap().unwrap();
    assert_eq!(contact.phone.as_deref(), Some("2615551234"));
    assert_eq!(contact.phone2.as_deref(), Some("2615559999"));
    assert_eq!(contact.name, "Maria Gomez");
    assert_eq!(env.db.list_contacts(1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_rows_without_match_or_phone_are_counted() {
    let env = TestEnv::new().await;
    let csv = "Display Name,Phone 1 - Value\nPedro,\n0042,\nLucia,12345\n";
    let stats = ContactReconciler::new(env.db.clone())
        .reconcile(1, csv.as_bytes(), false)
        .await
        .unwrap();

    assert_eq!(stats.rows, 3);
    assert_eq!(stats.rows_without_phones, 2);
    assert_eq!(stats.unmatched, 2);
    assert_eq!(stats.contacts_updated, 0);
}

#[tokio::test]
async fn test_dry_run_leaves_store_untouched() {
    let env = TestEnv::new().await;
    let id = env
        .db
        .create_contact(&Contact::new(1, "+5492612767072".into(), Some("+5492612767072".into()), ContactStatus::PhoneOnly))
        .await
        .unwrap();

    let csv = "First Name,Phone 1 - Value\nJuan Perez,2612767072\n";
    let stats = ContactReconciler::new(env.db.clone())
        .reconcile(1, csv.as_bytes(), true)
        .await
        .unwrap();
    assert!(stats.dry_run);
    assert_eq!(stats.contacts_updated, 1);

    let contact = env.db.get_contact(id).await.unwrap().unwrap();
    assert_eq!(contact.name, "+5492612767072");
    assert_eq!(contact.status, ContactStatus::PhoneOnly);
}

#[tokio::test]
async fn test_wrong_shape_is_rejected() {
    let env = TestEnv::new().await;
    let err = ContactReconciler::new(env.db.clone())
        .reconcile(1, b"Email,Company\na@b.c,ACME\n", false)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InputRejected);
}
