use barbershop_api::middleware::auth::hash_password;
use barbershop_core::models::user::{RegisterUserRequest, Role};
use barbershop_db::{
    create_pool,
    repositories::user::{self, NewUser},
    schema::initialize_database,
};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use dotenv::dotenv;
use std::env;

fn required(key: &str) -> Result<String> {
    env::var(key).wrap_err_with(|| format!("{} environment variable must be set", key))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Load environment variables
    dotenv().ok();

    let password = required("SUPERUSER_PASSWORD")?;
    let request = RegisterUserRequest {
        username: required("SUPERUSER_USERNAME")?,
        email: required("SUPERUSER_EMAIL")?,
        first_name: env::var("SUPERUSER_FIRST_NAME").unwrap_or_else(|_| "Admin".to_string()),
        last_name: env::var("SUPERUSER_LAST_NAME").unwrap_or_else(|_| "User".to_string()),
        phone_number: env::var("SUPERUSER_PHONE_NUMBER").unwrap_or_default(),
        password_confirmation: password.clone(),
        password,
    };
    request
        .validate()
        .map_err(|e| eyre!("Invalid superuser details: {}", e))?;

    let database_url = required("DATABASE_URL")?;
    let db_pool = create_pool(&database_url).await?;
    initialize_database(&db_pool).await?;

    if user::username_taken(&db_pool, &request.username, None).await? {
        bail!("A user named {} already exists", request.username);
    }
    if user::email_taken(&db_pool, &request.email, None).await? {
        bail!("A user with email {} already exists", request.email);
    }

    let password_hash = hash_password(&request.password)?;
    let created = user::create_user(
        &db_pool,
        &NewUser {
            username: &request.username,
            email: &request.email,
            first_name: &request.first_name,
            last_name: &request.last_name,
            phone_number: &request.phone_number,
            password_hash: &password_hash,
            role: Role::Superuser,
        },
    )
    .await?;

    println!("Superuser {} created ({}).", created.username, created.id);

    let superusers = user::count_by_role(&db_pool, Role::Superuser).await?;
    println!("There are now {} superuser account(s).", superusers);

    Ok(())
}
