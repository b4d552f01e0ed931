//! Registration and login workflows.

use crate::{
    error::AppError,
    models::{CreateUserForm, NewUser, RegisterForm, Role, UserRecord, normalize_email, optional},
    password::{hash_password, verify_password},
    repository::Repository,
    session::SessionUser,
};

const MISSING_FIELDS: &str = "Please fill in all fields";

/// register
///
/// Self-registration. Checks run in a fixed order and the first failure wins:
/// missing fields, password confirmation, email already taken, admin role
/// requested by someone who is not an admin. Only then is the password hashed
/// and the row inserted.
pub async fn register(
    repo: &dyn Repository,
    actor: Option<&SessionUser>,
    form: RegisterForm,
) -> Result<UserRecord, AppError> {
    let fields = [
        &form.name,
        &form.surname,
        &form.email,
        &form.password,
        &form.password2,
        &form.role,
    ];
    if fields.iter().any(|f| f.trim().is_empty()) {
        tracing::info!("registration rejected: missing fields");
        return Err(AppError::Validation(MISSING_FIELDS.to_string()));
    }

    if form.password != form.password2 {
        tracing::info!("registration rejected: password confirmation mismatch");
        return Err(AppError::Validation("Passwords do not match".to_string()));
    }

    let email = normalize_email(&form.email);
    ensure_email_free(repo, &email).await?;

    let role = Role::parse(&form.role)?;
    if role == Role::Admin && !actor.is_some_and(SessionUser::is_admin) {
        tracing::warn!(%email, actor = ?actor.map(|a| a.id), "registration rejected: admin role requested without admin session");
        return Err(AppError::Authorization(
            "You are not allowed to assign the admin role".to_string(),
        ));
    }

    let user = repo
        .create_user(NewUser {
            name: form.name.trim().to_string(),
            surname: form.surname.trim().to_string(),
            email,
            password_hash: hash_password(form.password).await?,
            role,
            phone: None,
            address: None,
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");
    Ok(user)
}

/// create_user_by_admin
///
/// Account creation from the user management screen. The caller already
/// passed the admin gate, so any role may be assigned.
pub async fn create_user_by_admin(
    repo: &dyn Repository,
    form: CreateUserForm,
) -> Result<UserRecord, AppError> {
    let required = [
        &form.name,
        &form.surname,
        &form.email,
        &form.password,
        &form.role,
    ];
    if required.iter().any(|f| f.trim().is_empty()) {
        return Err(AppError::Validation(MISSING_FIELDS.to_string()));
    }

    let email = normalize_email(&form.email);
    ensure_email_free(repo, &email).await?;
    let role = Role::parse(&form.role)?;

    let user = repo
        .create_user(NewUser {
            name: form.name.trim().to_string(),
            surname: form.surname.trim().to_string(),
            email,
            password_hash: hash_password(form.password).await?,
            role,
            phone: optional(&form.phone),
            address: optional(&form.address),
        })
        .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "user created by admin");
    Ok(user)
}

// Fast user-facing rejection. The unique index still decides races.
async fn ensure_email_free(repo: &dyn Repository, email: &str) -> Result<(), AppError> {
    if repo.find_user_by_email(email).await?.is_some() {
        tracing::info!(%email, "email already registered");
        return Err(AppError::Conflict(
            "This email address is already in use".to_string(),
        ));
    }
    Ok(())
}

/// authenticate
///
/// Console login. The role is checked before the password: members can never
/// sign in here, whatever they type. Unknown email and wrong password share
/// one error so the response does not reveal which accounts exist.
pub async fn authenticate(
    repo: &dyn Repository,
    email: &str,
    password: &str,
) -> Result<SessionUser, AppError> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        tracing::info!("login rejected: missing credentials");
        return Err(AppError::Validation(
            "Please enter your email and password".to_string(),
        ));
    }

    let Some(user) = repo.find_user_by_email(&email).await? else {
        tracing::info!(%email, "login failed: unknown email");
        return Err(AppError::InvalidCredentials);
    };

    if user.role != Role::Admin.as_str() {
        tracing::warn!(%email, role = %user.role, "login refused: not an admin");
        return Err(AppError::Authorization(
            "You do not have access to this area".to_string(),
        ));
    }

    if !verify_password(user.password_hash.clone(), password.to_string()).await {
        tracing::info!(%email, "login failed: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    tracing::info!(user_id = %user.id, "admin signed in");
    Ok(SessionUser::from(&user))
}
