//! Sign-in, registration and session commands.

use shopfront_storefront::error::AppError;
use shopfront_storefront::session::{AuthError, FileSessionStore, RegisterForm};
use shopfront_storefront::state::Storefront;

use super::CliError;

pub async fn login(
    storefront: &mut Storefront<FileSessionStore>,
    email: &str,
    password: &str,
) -> Result<(), CliError> {
    storefront.login(email, password).await?;
    print_signed_in(storefront);
    Ok(())
}

/// Register, listing each invalid field before failing.
#[allow(clippy::print_stdout)]
pub async fn register(
    storefront: &mut Storefront<FileSessionStore>,
    form: &RegisterForm,
) -> Result<(), CliError> {
    match storefront.register(form).await {
        Ok(()) => {
            print_signed_in(storefront);
            Ok(())
        }
        Err(AppError::Auth(AuthError::Invalid(errors))) => {
            for (field, message) in errors.iter() {
                println!("  {field}: {message}");
            }
            Err(CliError::Invalid(errors.len()))
        }
        Err(e) => Err(e.into()),
    }
}

#[allow(clippy::print_stdout)]
pub fn logout(storefront: &mut Storefront<FileSessionStore>) {
    storefront.logout();
    println!("Signed out");
}

/// Print who is signed in, if anyone.
#[allow(clippy::print_stdout)]
pub fn whoami(storefront: &Storefront<FileSessionStore>) {
    match storefront.session().user() {
        Some(user) => println!("{} <{}> ({})", user.name, user.email, user.role),
        None => println!("Not signed in"),
    }
}

#[allow(clippy::print_stdout)]
fn print_signed_in(storefront: &Storefront<FileSessionStore>) {
    if let Some(user) = storefront.session().user() {
        println!("Signed in as {} <{}>", user.name, user.email);
    }
}
