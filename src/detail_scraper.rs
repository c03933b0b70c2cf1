use reqwest::{
    StatusCode,
    header::{CONTENT_TYPE, HeaderMap, HeaderValue, ORIGIN, REFERER},
};
use scraper::{Html, Selector};
use serde::Serialize;

use crate::config::TransportConfig;
use crate::error::Error;
use crate::requests::{RawResponse, RequestClient, Transport};

const LOGIN_URL: &str = "https://ebilet.kkm.krakow.pl/ebilet/Logowanie";
const TICKET_URL: &str = "https://ebilet.kkm.krakow.pl/ebilet/KupBilet";
const EBILET_ORIGIN: &str = "https://ebilet.kkm.krakow.pl";
const EBILET_REFERER: &str = "https://ebilet.kkm.krakow.pl/ebilet/";

/// Cardholder contact record read off the ticket-purchase page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Detail {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

/// Extra headers for the credential POST; the endpoint checks that the
/// request looks like a submit of its own login form.
fn login_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/x-www-form-urlencoded"),
    );
    headers.insert(ORIGIN, HeaderValue::from_static(EBILET_ORIGIN));
    headers.insert(REFERER, HeaderValue::from_static(LOGIN_URL));
    headers
}

fn ticket_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(REFERER, HeaderValue::from_static(EBILET_REFERER));
    headers
}

/// The site treats the id pair as the whole credential; the two consent
/// flags are required verbatim by the endpoint.
fn login_form(student_id: u32, kkm_id: u32) -> Vec<(&'static str, String)> {
    vec![
        ("CityCardTypeCode", "0".to_string()),
        ("CustomerCodeStr", student_id.to_string()),
        ("CityCardNumberStr", kkm_id.to_string()),
        ("AcceptRegulamin", "true".to_string()),
        ("AcceptDaneOsobowe", "true".to_string()),
    ]
}

fn ensure_ok(response: &RawResponse) -> Result<(), Error> {
    if response.status != StatusCode::OK {
        return Err(Error::HttpStatus(response.status));
    }
    Ok(())
}

fn input_value(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).unwrap();
    document
        .select(&selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
}

/// Reads the cardholder form off the post-login page. First and last
/// name are mandatory; their absence means the page is malformed or the
/// session never authenticated.
pub fn parse_detail(html: &str) -> Result<Detail, Error> {
    let document = Html::parse_document(html);
    let first_name =
        input_value(&document, "input#clientName").ok_or(Error::MissingField("first name"))?;
    let last_name =
        input_value(&document, "input#clientSurname").ok_or(Error::MissingField("last name"))?;
    let email = input_value(&document, "input#customerEmail").unwrap_or_default();
    let phone = input_value(&document, "input#customerPhoneNumber").unwrap_or_default();
    Ok(Detail {
        first_name,
        last_name,
        email,
        phone,
    })
}

/// Replays the browser flow that reaches the authenticated
/// ticket-purchase page: anonymous GET, credential POST, authenticated
/// GET, all over one cookie jar.
#[derive(Debug)]
pub struct DetailScraper {
    student_id: u32,
    kkm_id: u32,
}

impl DetailScraper {
    pub fn new(student_id: u32, kkm_id: u32) -> Result<Self, Error> {
        if student_id == 0 {
            return Err(Error::InvalidId("student card ID"));
        }
        if kkm_id == 0 {
            return Err(Error::InvalidId("KKM card ID"));
        }
        Ok(Self { student_id, kkm_id })
    }

    /// Runs the login flow on a fresh session and hands the final page
    /// to the detail parser. The cookie jar and connection pool live
    /// only for this one call.
    pub async fn scrape(&self, config: &TransportConfig) -> Result<Detail, Error> {
        let client = RequestClient::new(config)?;
        let body = self.login_flow(&client).await?;
        parse_detail(&body)
    }

    /// Each step gates the next; a non-200 anywhere aborts the rest of
    /// the sequence.
    async fn login_flow<T: Transport>(&self, transport: &T) -> Result<String, Error> {
        // Step 1: anonymous GET seeds the session cookies. Body discarded.
        let response = transport.get(LOGIN_URL, HeaderMap::new()).await?;
        ensure_ok(&response)?;

        // Step 2: credential POST against the same endpoint.
        let form = login_form(self.student_id, self.kkm_id);
        let response = transport
            .post_form(LOGIN_URL, login_headers(), &form)
            .await?;
        ensure_ok(&response)?;

        // Step 3: the cookie jar now carries the session; fetch the
        // page with the cardholder form.
        let response = transport.get(TICKET_URL, ticket_headers()).await?;
        ensure_ok(&response)?;
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn detail_page(inputs: &str) -> String {
        format!("<html><body><form>{inputs}</form></body></html>")
    }

    const FULL_PAGE_INPUTS: &str = r#"
        <input id="clientName" value="Jan" />
        <input id="clientSurname" value="Kowalski" />
        <input id="customerEmail" value="jan@example.com" />
        <input id="customerPhoneNumber" value="600700800" />
    "#;

    #[test]
    fn parses_all_four_inputs() {
        let detail = parse_detail(&detail_page(FULL_PAGE_INPUTS)).unwrap();
        assert_eq!(
            detail,
            Detail {
                first_name: "Jan".to_string(),
                last_name: "Kowalski".to_string(),
                email: "jan@example.com".to_string(),
                phone: "600700800".to_string(),
            }
        );
    }

    #[test]
    fn missing_name_input_is_fatal() {
        let inputs = r#"<input id="clientSurname" value="Kowalski" />"#;
        let error = parse_detail(&detail_page(inputs)).unwrap_err();
        assert!(matches!(error, Error::MissingField("first name")));
    }

    #[test]
    fn missing_email_maps_to_empty_string() {
        let inputs = r#"
            <input id="clientName" value="Jan" />
            <input id="clientSurname" value="Kowalski" />
            <input id="customerPhoneNumber" value="600700800" />
        "#;
        let detail = parse_detail(&detail_page(inputs)).unwrap();
        assert_eq!(detail.email, "");
        assert_eq!(detail.phone, "600700800");
    }

    /// Scripted transport that records every call it sees.
    struct TransportDouble {
        responses: Vec<(StatusCode, String)>,
        calls: Mutex<Vec<String>>,
    }

    impl TransportDouble {
        fn new(responses: Vec<(StatusCode, String)>) -> Self {
            Self {
                responses,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn respond(&self, method: &str, url: &str) -> RawResponse {
            let mut calls = self.calls.lock().unwrap();
            let (status, body) = self.responses[calls.len()].clone();
            calls.push(format!("{method} {url}"));
            RawResponse { status, body }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for TransportDouble {
        async fn get(&self, url: &str, _headers: HeaderMap) -> Result<RawResponse, Error> {
            Ok(self.respond("GET", url))
        }

        async fn post_form(
            &self,
            url: &str,
            _headers: HeaderMap,
            form: &[(&'static str, String)],
        ) -> Result<RawResponse, Error> {
            assert!(form.contains(&("AcceptRegulamin", "true".to_string())));
            Ok(self.respond("POST", url))
        }
    }

    #[tokio::test]
    async fn login_flow_runs_the_three_steps_in_order() {
        let transport = TransportDouble::new(vec![
            (StatusCode::OK, String::new()),
            (StatusCode::OK, String::new()),
            (StatusCode::OK, detail_page(FULL_PAGE_INPUTS)),
        ]);
        let scraper = DetailScraper::new(123456, 654321).unwrap();
        let body = scraper.login_flow(&transport).await.unwrap();
        assert_eq!(
            transport.calls(),
            vec![
                format!("GET {LOGIN_URL}"),
                format!("POST {LOGIN_URL}"),
                format!("GET {TICKET_URL}"),
            ]
        );
        assert_eq!(parse_detail(&body).unwrap().first_name, "Jan");
    }

    #[tokio::test]
    async fn failed_login_page_fetch_stops_before_the_post() {
        let transport = TransportDouble::new(vec![(
            StatusCode::SERVICE_UNAVAILABLE,
            String::new(),
        )]);
        let scraper = DetailScraper::new(123456, 654321).unwrap();
        let error = scraper.login_flow(&transport).await.unwrap_err();
        assert!(
            matches!(error, Error::HttpStatus(status) if status == StatusCode::SERVICE_UNAVAILABLE)
        );
        assert_eq!(error.to_string(), "Service Unavailable");
        assert_eq!(transport.calls(), vec![format!("GET {LOGIN_URL}")]);
    }

    #[tokio::test]
    async fn failed_credential_post_stops_before_the_ticket_page() {
        let transport = TransportDouble::new(vec![
            (StatusCode::OK, String::new()),
            (StatusCode::FORBIDDEN, String::new()),
        ]);
        let scraper = DetailScraper::new(123456, 654321).unwrap();
        let error = scraper.login_flow(&transport).await.unwrap_err();
        assert!(matches!(error, Error::HttpStatus(status) if status == StatusCode::FORBIDDEN));
        assert_eq!(transport.calls().len(), 2);
    }

    #[test]
    fn zero_ids_are_rejected_up_front() {
        assert!(matches!(
            DetailScraper::new(0, 1),
            Err(Error::InvalidId("student card ID"))
        ));
        assert!(matches!(
            DetailScraper::new(1, 0),
            Err(Error::InvalidId("KKM card ID"))
        ));
    }
}
