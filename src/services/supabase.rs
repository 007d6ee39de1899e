// ============================================================================
// CLIENTE DE DATOS - SOLO COMUNICACIÓN HTTP (Stateless)
// ============================================================================
// Habla el dialecto REST del backend alojado (PostgREST): escrituras por
// tabla e id de fila, lecturas filtradas por usuario y rango de fechas.
// Es el único sitio que ve formas de error del transporte; hacia fuera
// solo salen clases de `DataError`.

use std::cell::RefCell;

use futures::future::LocalBoxFuture;
use gloo_net::http::{Method, Request, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::Value;

use crate::config::CONFIG;
use crate::models::filter::QueryRange;
use crate::services::error::DataError;

/// Verbos de escritura que necesita la cola offline. Abstraídos para poder
/// sustituir el backend real por uno guionizado en tests.
pub trait WriteBackend {
    fn insert<'a>(
        &'a self,
        table: &'a str,
        payload: &'a Value,
    ) -> LocalBoxFuture<'a, Result<(), DataError>>;

    fn update<'a>(
        &'a self,
        table: &'a str,
        record_id: &'a str,
        payload: &'a Value,
    ) -> LocalBoxFuture<'a, Result<(), DataError>>;

    fn delete<'a>(
        &'a self,
        table: &'a str,
        record_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<(), DataError>>;
}

/// Forma de error que devuelve el backend en el cuerpo de la respuesta
#[derive(Deserialize)]
struct PostgrestError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Clone)]
pub struct SupabaseClient {
    base_url: String,
    anon_key: String,
    access_token: RefCell<Option<String>>,
}

impl SupabaseClient {
    pub fn new(base_url: &str, anon_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            access_token: RefCell::new(None),
        }
    }

    pub fn from_config() -> Self {
        Self::new(&CONFIG.supabase_url, &CONFIG.supabase_anon_key)
    }

    /// Token de la sesión activa; sin él las peticiones van con la anon key
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.borrow_mut() = token;
    }

    fn bearer(&self) -> String {
        let token = self.access_token.borrow();
        format!("Bearer {}", token.as_deref().unwrap_or(&self.anon_key))
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn write_request(&self, method: Method, url: &str) -> RequestBuilder {
        RequestBuilder::new(url)
            .method(method)
            .header("apikey", &self.anon_key)
            .header("Authorization", &self.bearer())
            .header("Prefer", "return=minimal")
    }

    async fn check_write(&self, response: Response) -> Result<(), DataError> {
        if response.ok() {
            return Ok(());
        }
        Err(classify_response(response).await)
    }

    /// Filas de una tabla del usuario dentro del rango de fechas activo
    pub async fn fetch_rows(
        &self,
        table: &str,
        user_id: &str,
        range: &QueryRange,
    ) -> Result<Vec<Value>, DataError> {
        let url = select_url(&self.base_url, table, user_id, range);
        let response = Request::get(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", &self.bearer())
            .send()
            .await
            .map_err(DataError::network)?;

        if !response.ok() {
            return Err(classify_response(response).await);
        }
        response
            .json::<Vec<Value>>()
            .await
            .map_err(|e| DataError::Permanent(format!("Parse error: {}", e)))
    }
}

impl WriteBackend for SupabaseClient {
    fn insert<'a>(
        &'a self,
        table: &'a str,
        payload: &'a Value,
    ) -> LocalBoxFuture<'a, Result<(), DataError>> {
        Box::pin(async move {
            log::info!("📤 insert en {}", table);
            let response = self
                .write_request(Method::POST, &self.rest_url(table))
                .json(payload)
                .map_err(|e| DataError::Permanent(format!("Serialization error: {}", e)))?
                .send()
                .await
                .map_err(DataError::network)?;
            self.check_write(response).await
        })
    }

    fn update<'a>(
        &'a self,
        table: &'a str,
        record_id: &'a str,
        payload: &'a Value,
    ) -> LocalBoxFuture<'a, Result<(), DataError>> {
        Box::pin(async move {
            log::info!("📝 update en {} (fila {})", table, record_id);
            let url = format!("{}?id=eq.{}", self.rest_url(table), record_id);
            let response = self
                .write_request(Method::PATCH, &url)
                .json(payload)
                .map_err(|e| DataError::Permanent(format!("Serialization error: {}", e)))?
                .send()
                .await
                .map_err(DataError::network)?;
            self.check_write(response).await
        })
    }

    fn delete<'a>(
        &'a self,
        table: &'a str,
        record_id: &'a str,
    ) -> LocalBoxFuture<'a, Result<(), DataError>> {
        Box::pin(async move {
            log::info!("🗑️ delete en {} (fila {})", table, record_id);
            let url = format!("{}?id=eq.{}", self.rest_url(table), record_id);
            let response = self
                .write_request(Method::DELETE, &url)
                .send()
                .await
                .map_err(DataError::network)?;
            self.check_write(response).await
        })
    }
}

async fn classify_response(response: Response) -> DataError {
    let status = response.status();
    let (code, message) = match response.json::<PostgrestError>().await {
        Ok(body) => (
            body.code,
            body.message.unwrap_or_else(|| format!("HTTP {}", status)),
        ),
        Err(_) => (None, format!("HTTP {}", status)),
    };
    DataError::from_status(status, code.as_deref(), message)
}

fn select_url(base_url: &str, table: &str, user_id: &str, range: &QueryRange) -> String {
    let mut url = format!(
        "{}/rest/v1/{}?select=*&user_id=eq.{}&order=date.desc",
        base_url, table, user_id
    );
    if let Some(gte) = range.gte {
        url.push_str(&format!("&date=gte.{}", gte));
    }
    if let Some(lt) = range.lt {
        url.push_str(&format!("&date=lt.{}", lt));
    }
    url
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn select_url_applies_date_bounds() {
        let range = QueryRange {
            gte: NaiveDate::from_ymd_opt(2026, 7, 1),
            lt: NaiveDate::from_ymd_opt(2026, 8, 1),
        };
        let url = select_url("https://x.supabase.co", "income", "u1", &range);
        assert_eq!(
            url,
            "https://x.supabase.co/rest/v1/income?select=*&user_id=eq.u1&order=date.desc&date=gte.2026-07-01&date=lt.2026-08-01"
        );
    }

    #[test]
    fn select_url_without_filter_has_no_bounds() {
        let url = select_url("https://x.supabase.co", "expenses", "u1", &QueryRange::default());
        assert!(!url.contains("date=gte"));
        assert!(!url.contains("date=lt"));
    }

    #[test]
    fn bearer_falls_back_to_anon_key() {
        let client = SupabaseClient::new("https://x.supabase.co/", "anon-key");
        assert_eq!(client.bearer(), "Bearer anon-key");
        client.set_access_token(Some("jwt-abc".into()));
        assert_eq!(client.bearer(), "Bearer jwt-abc");
        assert_eq!(client.rest_url("income"), "https://x.supabase.co/rest/v1/income");
    }
}
