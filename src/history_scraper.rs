use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use reqwest::StatusCode;
use scraper::{Html, Selector};
use serde::Serialize;

use crate::card_types::city_card_code;
use crate::error::{Error, FieldError, FieldErrorKind};
use crate::requests::REQUEST_TIMEOUT;
use crate::text_manipulators::{bold_text, extract_text};

const HISTORY_URL: &str = "http://www.mpk.krakow.pl/pl/sprawdz-waznosc-biletu/index,1.html";
const PURCHASE_FORMAT: &str = "%Y-%m-%d %H:%M";
const EXPIRY_FORMAT: &str = "%Y-%m-%d";

const TYPE_LABEL: &str = "Rodzaj biletu:";

/// One historical fare purchase tied to a KKM card.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Ticket {
    #[serde(rename = "type")]
    pub ticket_type: String,
    pub purchased_at: NaiveDateTime,
    pub expires_at: NaiveDate,
    pub student_id: u32,
    pub kkm_id: u32,
    /// Grosz, i.e. "12,50 zł" is stored as 1250.
    pub price: u32,
}

/// What a history scan produced: tickets that parsed cleanly plus any
/// field-level failures met along the way. The scan is best-effort; a
/// malformed row never discards the rest of the page.
#[derive(Debug)]
pub struct HistoryOutcome {
    pub tickets: Vec<Ticket>,
    pub field_errors: Vec<FieldError>,
}

/// The five labelled rows that fill in a ticket opened by a
/// "Rodzaj biletu:" row.
#[derive(Clone, Copy, Debug)]
enum TicketField {
    PurchasedAt,
    StudentId,
    KkmId,
    Price,
    ExpiresAt,
}

impl TicketField {
    fn label(self) -> &'static str {
        match self {
            Self::PurchasedAt => "Data i godzina zakupu:",
            Self::StudentId => "Numer legitymacji:",
            Self::KkmId => "Numer karty KKM:",
            Self::Price => "Cena:",
            Self::ExpiresAt => "Data końca ważności:",
        }
    }
}

/// How a row drives the scan state machine.
enum Row {
    NewTicket,
    Field(TicketField),
}

fn recognize(line: &str) -> Option<Row> {
    if line.contains(TYPE_LABEL) {
        return Some(Row::NewTicket);
    }
    let fields = [
        TicketField::PurchasedAt,
        TicketField::StudentId,
        TicketField::KkmId,
        TicketField::Price,
        TicketField::ExpiresAt,
    ];
    fields
        .into_iter()
        .find(|field| line.contains(field.label()))
        .map(Row::Field)
}

/// A ticket under construction; becomes a [`Ticket`] only once every
/// labelled row has been seen.
#[derive(Debug, Default)]
struct PartialTicket {
    ticket_type: String,
    purchased_at: Option<NaiveDateTime>,
    expires_at: Option<NaiveDate>,
    student_id: Option<u32>,
    kkm_id: Option<u32>,
    price: Option<u32>,
}

impl PartialTicket {
    fn new(ticket_type: String) -> Self {
        Self {
            ticket_type,
            ..Self::default()
        }
    }

    fn complete(self) -> Result<Ticket, FieldError> {
        match (
            self.purchased_at,
            self.expires_at,
            self.student_id,
            self.kkm_id,
            self.price,
        ) {
            (Some(purchased_at), Some(expires_at), Some(student_id), Some(kkm_id), Some(price)) => {
                Ok(Ticket {
                    ticket_type: self.ticket_type,
                    purchased_at,
                    expires_at,
                    student_id,
                    kkm_id,
                    price,
                })
            }
            _ => Err(FieldError {
                label: TYPE_LABEL,
                kind: FieldErrorKind::Incomplete,
            }),
        }
    }
}

fn parse_price(value: &str, pattern: &Regex) -> Result<u32, FieldErrorKind> {
    let captures = pattern.captures(value).ok_or(FieldErrorKind::Price)?;
    let major: u32 = captures[1].parse().map_err(|_| FieldErrorKind::Price)?;
    let minor: u32 = captures[2].parse().map_err(|_| FieldErrorKind::Price)?;
    // The page is untrusted; an absurdly large amount must not wrap.
    major
        .checked_mul(100)
        .and_then(|grosz| grosz.checked_add(minor))
        .ok_or(FieldErrorKind::Price)
}

/// Scans the validity-check page for ticket blocks. Each block is a run
/// of labelled `<div>` rows opened by a "Rodzaj biletu:" row; labels
/// the scan does not recognize are skipped so extra site content is
/// harmless. Tickets come back sorted ascending by purchase time.
pub fn parse_history(html: &str) -> Result<HistoryOutcome, Error> {
    let document = Html::parse_document(html);
    let row_selector = Selector::parse("div.kkm-card > div").unwrap();
    let bold_selector = Selector::parse("b").unwrap();
    let price_pattern = Regex::new(r"^(\d+),(\d+) zł$").unwrap();

    let mut tickets = Vec::new();
    let mut field_errors = Vec::new();
    let mut current: Option<PartialTicket> = None;
    let mut saw_type_row = false;

    for row in document.select(&row_selector) {
        let line = extract_text(row);
        let Some(kind) = recognize(&line) else {
            continue;
        };
        let value = bold_text(row, &bold_selector);
        match kind {
            Row::NewTicket => {
                saw_type_row = true;
                close(current.take(), &mut tickets, &mut field_errors);
                current = Some(PartialTicket::new(value));
            }
            Row::Field(field) => {
                // A labelled row before the first "Rodzaj biletu:" has
                // no ticket to land in; skip it.
                let Some(partial) = current.as_mut() else {
                    continue;
                };
                let parsed = match field {
                    TicketField::PurchasedAt => {
                        NaiveDateTime::parse_from_str(&value, PURCHASE_FORMAT)
                            .map(|at| partial.purchased_at = Some(at))
                            .map_err(FieldErrorKind::from)
                    }
                    TicketField::ExpiresAt => NaiveDate::parse_from_str(&value, EXPIRY_FORMAT)
                        .map(|at| partial.expires_at = Some(at))
                        .map_err(FieldErrorKind::from),
                    TicketField::StudentId => value
                        .parse::<u32>()
                        .map(|id| partial.student_id = Some(id))
                        .map_err(FieldErrorKind::from),
                    TicketField::KkmId => value
                        .parse::<u32>()
                        .map(|id| partial.kkm_id = Some(id))
                        .map_err(FieldErrorKind::from),
                    TicketField::Price => {
                        parse_price(&value, &price_pattern).map(|price| partial.price = Some(price))
                    }
                };
                if let Err(kind) = parsed {
                    field_errors.push(FieldError {
                        label: field.label(),
                        kind,
                    });
                }
            }
        }
    }
    close(current.take(), &mut tickets, &mut field_errors);

    if !saw_type_row {
        return Err(Error::EmptyHistory);
    }
    // Stable sort keeps document order for equal timestamps.
    tickets.sort_by_key(|ticket| ticket.purchased_at);
    Ok(HistoryOutcome {
        tickets,
        field_errors,
    })
}

fn close(
    partial: Option<PartialTicket>,
    tickets: &mut Vec<Ticket>,
    field_errors: &mut Vec<FieldError>,
) {
    if let Some(partial) = partial {
        match partial.complete() {
            Ok(ticket) => tickets.push(ticket),
            Err(error) => field_errors.push(error),
        }
    }
}

/// Fetches the purchase history of one student card with a single
/// unauthenticated GET against the MPK validity-check page.
#[derive(Debug)]
pub struct HistoryScraper {
    card_code: u32,
    student_id: u32,
}

impl HistoryScraper {
    /// Fails fast on an unknown university acronym or a zero ID; no
    /// request is issued in either case.
    pub fn new(card_type: &str, student_id: u32) -> Result<Self, Error> {
        let card_code = city_card_code(card_type).ok_or(Error::UnknownCardType)?;
        if student_id == 0 {
            return Err(Error::InvalidId("student card ID"));
        }
        Ok(Self {
            card_code,
            student_id,
        })
    }

    pub fn url(&self) -> String {
        format!(
            "{HISTORY_URL}?cityCardType={}&dateValidity=1970-01-01&identityNumber={}&sprawdz_kkm=Sprawd%C5%BA",
            self.card_code, self.student_id
        )
    }

    pub async fn scrape(&self) -> Result<HistoryOutcome, Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let response = client.get(self.url()).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(Error::HttpStatus(status));
        }
        parse_history(&body)
    }
}
