use actix_web::{
    delete, get,
    http::{Method, StatusCode},
    patch, post,
    web::{self, Data},
    HttpResponse, Responder,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{
    auth::AuthenticatedUser,
    db,
    errors::AppError,
    structs::{ExpenseChanges, NewExpense},
    utils::{normalize_email, verify_password},
    AppState,
};

/// liveness
#[get("/")]
pub async fn index_handler() -> impl Responder {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("API running")
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct Register {
    pub name: Option<String>,
    pub occupation: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Default)]
pub struct Login {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Deserialize, Serialize, Debug)]
pub struct TokenResponse {
    pub token: String,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[post("/register")]
pub async fn register_handler(
    web::Json(form): web::Json<Register>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let (Some(name), Some(email), Some(password)) = (
        present(&form.name),
        present(&form.email),
        present(&form.password),
    ) else {
        return Err(AppError::Validation(
            "Name, email, password are required".into(),
        ));
    };
    let lc_email = normalize_email(email);

    if db::get_user_by_email(&state, &lc_email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let occupation = form.occupation.as_deref().unwrap_or_default();
    db::create_user(&state, name.trim(), occupation, &lc_email, password).await?;

    Ok(HttpResponse::Created().json(json!({ "message": "User registered successfully" })))
}

#[post("/login")]
pub async fn login_handler(
    web::Json(form): web::Json<Login>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let (Some(email), Some(password)) = (present(&form.email), present(&form.password)) else {
        return Err(AppError::Validation("Email and password required".into()));
    };
    let lc_email = normalize_email(email);

    let Some(user) = db::get_user_by_email(&state, &lc_email).await? else {
        return Err(AppError::InvalidCredentials);
    };
    match verify_password(password, &user.pwd_hash) {
        Ok(true) => {}
        Ok(false) => return Err(AppError::InvalidCredentials),
        Err(e) => {
            log::warn!("Stored hash for user {} is unreadable: {}", user.id, e);
            return Err(AppError::InvalidCredentials);
        }
    }

    let token = state.tokens.issue(user.id)?;
    log::info!("User {} logged in", user.id);
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

#[get("/profile")]
pub async fn profile_handler(
    identity: AuthenticatedUser,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let user = db::get_user_by_id(&state, identity.id)
        .await?
        .ok_or(AppError::NotFound("User not found"))?;
    Ok(HttpResponse::Ok().json(user))
}

#[get("/expenses")]
pub async fn list_expenses_handler(
    identity: AuthenticatedUser,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let expenses = db::list_expenses(&state, identity).await?;
    Ok(HttpResponse::Ok().json(expenses))
}

#[post("/expenses")]
pub async fn create_expense_handler(
    identity: AuthenticatedUser,
    web::Json(body): web::Json<NewExpense>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let expense = db::create_expense(&state, identity, body).await?;
    Ok(HttpResponse::Created().json(expense))
}

#[patch("/expenses/{id}")]
pub async fn update_expense_handler(
    identity: AuthenticatedUser,
    path: web::Path<i64>,
    web::Json(changes): web::Json<ExpenseChanges>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let expense = db::update_expense(&state, identity, path.into_inner(), changes)
        .await?
        .ok_or(AppError::NotFound("Expense not found"))?;
    Ok(HttpResponse::Ok().json(expense))
}

#[delete("/expenses/{id}")]
pub async fn delete_expense_handler(
    identity: AuthenticatedUser,
    path: web::Path<i64>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    if !db::delete_expense(&state, identity, path.into_inner()).await? {
        return Err(AppError::NotFound("Expense not found"));
    }
    Ok(HttpResponse::Ok().json(json!({ "message": "Expense deleted" })))
}

pub async fn default_handler(req_method: Method) -> HttpResponse {
    match req_method {
        Method::GET => {
            HttpResponse::build(StatusCode::NOT_FOUND).json(json!({ "message": "Not found" }))
        }
        _ => HttpResponse::MethodNotAllowed().finish(),
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::Validation(err.to_string()).into()),
    )
    .service(index_handler)
    .service(register_handler)
    .service(login_handler)
    .service(profile_handler)
    .service(list_expenses_handler)
    .service(create_expense_handler)
    .service(update_expense_handler)
    .service(delete_expense_handler);
}
