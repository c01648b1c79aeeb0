//! Sign-in, registration and session persistence against the fake shop.

use shopfront_integration_tests::{FakeShop, TAKEN_EMAIL, VALID_PASSWORD, session_dir};
use shopfront_storefront::error::AppError;
use shopfront_storefront::session::{AuthError, RegisterForm};
use shopfront_storefront::state::Screen;

#[tokio::test]
async fn test_login_persists_across_restarts() {
    let shop = FakeShop::start().await;
    let dir = session_dir();

    let mut storefront = shop.storefront(&dir);
    assert_eq!(storefront.screen(), Screen::Landing);
    storefront
        .login("ana@example.com", VALID_PASSWORD)
        .await
        .expect("login should succeed");
    assert_eq!(storefront.screen(), Screen::Catalog);
    drop(storefront);

    let restored = shop.storefront(&dir);
    assert!(restored.session().is_authenticated());
    assert_eq!(restored.screen(), Screen::Catalog);
    let user = restored.session().user().expect("user should be restored");
    assert_eq!(user.email, "ana@example.com");
    assert!(!restored.session().is_admin());
}

#[tokio::test]
async fn test_wrong_password_shows_server_message() {
    let shop = FakeShop::start().await;
    let mut storefront = shop.storefront(&session_dir());

    let err = storefront
        .login("ana@example.com", "wrong")
        .await
        .expect_err("login should fail");
    assert!(matches!(err, AppError::Auth(AuthError::Rejected(_))));
    assert_eq!(err.user_message(), "Invalid credentials");
    assert!(!storefront.session().is_authenticated());
    assert_eq!(storefront.screen(), Screen::Landing);
}

#[tokio::test]
async fn test_register_taken_email() {
    let shop = FakeShop::start().await;
    let mut storefront = shop.storefront(&session_dir());

    let err = storefront
        .register(&RegisterForm::new(
            "Ana",
            TAKEN_EMAIL,
            VALID_PASSWORD,
            VALID_PASSWORD,
        ))
        .await
        .expect_err("register should fail");
    assert_eq!(err.user_message(), "Email already registered");

    storefront
        .register(&RegisterForm::new(
            "Beto",
            "beto@example.com",
            VALID_PASSWORD,
            VALID_PASSWORD,
        ))
        .await
        .expect("register should succeed");
    let user = storefront.session().user().expect("signed in");
    assert_eq!(user.name, "Beto");
}

#[tokio::test]
async fn test_register_rejects_short_password_locally() {
    let shop = FakeShop::start().await;
    let mut storefront = shop.storefront(&session_dir());

    let err = storefront
        .register(&RegisterForm::new("Beto", "beto@example.com", "12345", "12345"))
        .await
        .expect_err("register should fail");
    assert!(matches!(err, AppError::Auth(AuthError::Invalid(_))));
    assert_eq!(err.user_message(), "Password must be at least 6 characters");
    assert!(!storefront.session().is_authenticated());
}

#[tokio::test]
async fn test_logout_forgets_session() {
    let shop = FakeShop::start().await;
    let dir = session_dir();

    let mut storefront = shop.storefront(&dir);
    storefront
        .login("ana@example.com", VALID_PASSWORD)
        .await
        .expect("login should succeed");
    storefront.logout();
    assert_eq!(storefront.screen(), Screen::Landing);

    let restored = shop.storefront(&dir);
    assert!(!restored.session().is_authenticated());
}
