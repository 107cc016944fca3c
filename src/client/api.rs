use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::{ClientError, Session};
use crate::structs::{Expense, ExpenseChanges, NewExpense, User};

#[derive(Debug, Serialize)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub occupation: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    message: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Add/edit guard: the server does not re-check these.
pub fn check_expense_form(title: &str, category: &str) -> Result<(), ClientError> {
    if title.is_empty() || category.is_empty() {
        return Err(ClientError::Form("All fields are required"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn register(&self, registration: &Registration<'_>) -> Result<String, ClientError> {
        let response = self
            .http
            .post(self.url("/register"))
            .json(registration)
            .send()
            .await?;
        let body: MessageResponse = decode(response).await?;
        Ok(body.message)
    }

    /// Exchanges credentials for a fresh session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let response = self
            .http
            .post(self.url("/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;
        let body: TokenResponse = decode(response).await?;
        Ok(Session::new(body.token))
    }

    pub async fn profile(&self, session: &mut Session) -> Result<User, ClientError> {
        let request = self.authed(session, Method::GET, "/profile")?;
        send(session, request).await
    }

    pub async fn list_expenses(&self, session: &mut Session) -> Result<Vec<Expense>, ClientError> {
        let request = self.authed(session, Method::GET, "/expenses")?;
        send(session, request).await
    }

    pub async fn create_expense(
        &self,
        session: &mut Session,
        expense: &NewExpense,
    ) -> Result<Expense, ClientError> {
        check_expense_form(&expense.title, expense.category.as_deref().unwrap_or_default())?;
        let request = self.authed(session, Method::POST, "/expenses")?.json(expense);
        send(session, request).await
    }

    pub async fn update_expense(
        &self,
        session: &mut Session,
        id: i64,
        changes: &ExpenseChanges,
    ) -> Result<Expense, ClientError> {
        if changes.title.as_deref() == Some("") || changes.category.as_deref() == Some("") {
            return Err(ClientError::Form("All fields are required"));
        }
        let request = self
            .authed(session, Method::PATCH, &format!("/expenses/{}", id))?
            .json(changes);
        send(session, request).await
    }

    pub async fn delete_expense(&self, session: &mut Session, id: i64) -> Result<String, ClientError> {
        let request = self.authed(session, Method::DELETE, &format!("/expenses/{}", id))?;
        let body: MessageResponse = send(session, request).await?;
        Ok(body.message)
    }

    fn authed(&self, session: &Session, method: Method, path: &str) -> Result<RequestBuilder, ClientError> {
        let token = session.token().ok_or(ClientError::NotLoggedIn)?;
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }
}

/// Sends an authenticated request; a 401 ends the session.
async fn send<T: DeserializeOwned>(
    session: &mut Session,
    request: RequestBuilder,
) -> Result<T, ClientError> {
    let response = request.send().await?;
    if response.status() == StatusCode::UNAUTHORIZED {
        log::debug!("Server rejected the token; dropping session");
        session.invalidate();
        return Err(ClientError::SessionExpired);
    }
    decode(response).await
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let message = match response.json::<MessageResponse>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_owned(),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build_app, test_support::test_state};
    use actix_web::HttpServer;
    use chrono::NaiveDate;

    /// Serves the real application on an ephemeral port.
    async fn spawn_server() -> ApiClient {
        let state = test_state().await;
        let server = HttpServer::new(move || build_app(state.clone()))
            .workers(1)
            .disable_signals()
            .bind(("127.0.0.1", 0))
            .unwrap();
        let addr = server.addrs()[0];
        actix_web::rt::spawn(server.run());
        ApiClient::new(format!("http://{}/", addr))
    }

    async fn logged_in(api: &ApiClient, email: &str) -> Session {
        api.register(&Registration {
            name: "Ann",
            occupation: "Engineer",
            email,
            password: "pw123",
        })
        .await
        .unwrap();
        api.login(email, "pw123").await.unwrap()
    }

    #[test]
    fn form_guard_requires_title_and_category() {
        assert!(matches!(check_expense_form("", "Food"), Err(ClientError::Form(_))));
        assert!(matches!(check_expense_form("Tea", ""), Err(ClientError::Form(_))));
        assert!(check_expense_form("Tea", "Food").is_ok());
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let api = ApiClient::new("http://localhost:5000/");
        assert_eq!(api.url("/expenses"), "http://localhost:5000/expenses");
    }

    #[actix_web::test]
    async fn calls_without_a_session_fail_locally() {
        let api = ApiClient::new("http://127.0.0.1:9");
        let mut session = Session::anonymous();
        assert!(matches!(
            api.list_expenses(&mut session).await,
            Err(ClientError::NotLoggedIn)
        ));
    }

    #[actix_web::test]
    async fn full_round_trip_against_the_server() {
        let api = spawn_server().await;
        let mut session = logged_in(&api, "ann@x.com").await;

        let profile = api.profile(&mut session).await.unwrap();
        assert_eq!(profile.email, "ann@x.com");
        assert_eq!(profile.occupation, "Engineer");

        let created = api
            .create_expense(
                &mut session,
                &NewExpense {
                    title: "Coffee".into(),
                    amount: 5.0,
                    category: Some("Food".into()),
                    date: NaiveDate::from_ymd_opt(2024, 1, 5),
                },
            )
            .await
            .unwrap();

        let changes = ExpenseChanges {
            amount: Some(7.0),
            ..Default::default()
        };
        let updated = api.update_expense(&mut session, created.id, &changes).await.unwrap();
        assert_eq!(updated.amount, 7.0);
        assert_eq!(updated.title, "Coffee");

        assert_eq!(api.list_expenses(&mut session).await.unwrap(), vec![updated]);
        assert_eq!(
            api.delete_expense(&mut session, created.id).await.unwrap(),
            "Expense deleted"
        );
        assert!(api.list_expenses(&mut session).await.unwrap().is_empty());
        assert!(session.is_active());
    }

    #[actix_web::test]
    async fn server_messages_surface_as_api_errors() {
        let api = spawn_server().await;
        logged_in(&api, "ann@x.com").await;

        match api.login("ann@x.com", "wrong").await {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid credentials");
            }
            other => panic!("unexpected: {:?}", other),
        }

        let mut session = api.login("ann@x.com", "pw123").await.unwrap();
        match api.delete_expense(&mut session, 12345).await {
            Err(ClientError::Api { status, message }) => {
                assert_eq!(status, 404);
                assert_eq!(message, "Expense not found");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[actix_web::test]
    async fn rejected_token_invalidates_the_session() {
        let api = spawn_server().await;
        let mut session = Session::new("forged.token.value");
        assert!(matches!(
            api.list_expenses(&mut session).await,
            Err(ClientError::SessionExpired)
        ));
        assert!(!session.is_active());
    }
}
