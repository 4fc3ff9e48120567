//! Digest rendering and delivery.
//!
//! One [`EmailData`] drives both output artifacts (HTML and plain text) and
//! both delivery channels, so the composer never knows or cares where the
//! digest ends up.
//!
//! Delivery failures are isolated per user: one bad address or SMTP hiccup
//! becomes that user's [`SendOutcome`] and the loop moves on. Only storage
//! errors abort the run.

use askama::Template;
use chrono::NaiveDate;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{error, info, warn};

use dealbird_core::{EmailData, EnrichedDeal, RetailerDeals, SendOutcome};

use crate::config::{BrandConfig, EmailConfig, SmtpConfig};
use crate::filters;
use crate::services::compose::compose_digest;
use crate::store::{DealStore, StoreError};

/// Failure reason recorded when a user has no active deals at their
/// preferred retailers.
pub const NO_MATCHING_DEALS: &str = "No matching deals";

/// How many deals the highlight section shows at most.
const TOP_DEALS_LIMIT: usize = 6;

/// Errors that can occur when rendering or sending a digest.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Errors that can occur when previewing a digest.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// HTML template for the weekly digest email.
#[derive(Template)]
#[template(path = "email/weekly_digest.html")]
struct WeeklyDigestHtml<'a> {
    brand: &'a BrandConfig,
    user_name: &'a str,
    top_deals: &'a [EnrichedDeal],
    deals_by_retailer: &'a [RetailerDeals],
}

/// Plain text template for the weekly digest email.
#[derive(Template)]
#[template(path = "email/weekly_digest.txt")]
struct WeeklyDigestText<'a> {
    brand: &'a BrandConfig,
    user_name: &'a str,
    top_deals: &'a [EnrichedDeal],
    deals_by_retailer: &'a [RetailerDeals],
}

/// A rendered digest, ready for any delivery channel.
#[derive(Debug, Clone)]
pub struct RenderedDigest {
    pub html: String,
    pub text: String,
}

/// Render both artifacts for one digest.
///
/// # Errors
///
/// Returns `DeliveryError::Template` if rendering fails.
pub fn render_digest(
    data: &EmailData,
    brand: &BrandConfig,
) -> Result<RenderedDigest, DeliveryError> {
    let cap = data.top_deals.len().min(TOP_DEALS_LIMIT);
    let top_deals = data.top_deals.get(..cap).unwrap_or(&data.top_deals);

    let html = WeeklyDigestHtml {
        brand,
        user_name: &data.user_name,
        top_deals,
        deals_by_retailer: &data.deals_by_retailer,
    }
    .render()?;

    let text = WeeklyDigestText {
        brand,
        user_name: &data.user_name,
        top_deals,
        deals_by_retailer: &data.deals_by_retailer,
    }
    .render()?;

    Ok(RenderedDigest { html, text })
}

/// The configured delivery channel.
pub enum Mailer {
    /// Print the rendered digest to the operator log instead of sending.
    Console,
    /// Deliver via an SMTP relay.
    Smtp(SmtpMailer),
}

impl Mailer {
    /// Build the channel selected by configuration.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Smtp` if the SMTP relay cannot be set up.
    pub fn from_config(config: &EmailConfig) -> Result<Self, DeliveryError> {
        match config {
            EmailConfig::Console => Ok(Self::Console),
            EmailConfig::Smtp(smtp) => Ok(Self::Smtp(SmtpMailer::new(smtp)?)),
        }
    }

    /// Deliver one rendered digest.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError` if the message cannot be built or sent. The
    /// console channel never fails.
    pub async fn deliver(
        &self,
        data: &EmailData,
        rendered: &RenderedDigest,
        brand: &BrandConfig,
    ) -> Result<(), DeliveryError> {
        match self {
            Self::Console => {
                info!(
                    to = %data.to,
                    html_bytes = rendered.html.len(),
                    "Console delivery:\n{}",
                    rendered.text
                );
                Ok(())
            }
            Self::Smtp(mailer) => mailer.send(data, rendered, brand).await,
        }
    }
}

/// SMTP delivery via lettre.
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a new SMTP mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send(
        &self,
        data: &EmailData,
        rendered: &RenderedDigest,
        brand: &BrandConfig,
    ) -> Result<(), DeliveryError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| DeliveryError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(data
                .to
                .as_str()
                .parse()
                .map_err(|_| DeliveryError::InvalidAddress(data.to.to_string()))?)
            .subject(format!("Your weekly deals from {}", brand.name))
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(rendered.text.clone()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(rendered.html.clone()),
                    ),
            )?;

        self.mailer.send(email).await?;

        info!(to = %data.to, "Email sent");
        Ok(())
    }
}

/// Send the weekly digest to every user in storage order.
///
/// Per-user outcomes are collected rather than propagated: a user with no
/// matching deals is recorded with [`NO_MATCHING_DEALS`], and a rendering or
/// delivery failure is recorded with its message. Processing always
/// continues with the next user.
///
/// # Errors
///
/// Returns `StoreError` if listing users or querying deals fails; that
/// aborts the run.
pub async fn send_weekly_digests(
    store: &dyn DealStore,
    mailer: &Mailer,
    brand: &BrandConfig,
    today: NaiveDate,
) -> Result<Vec<SendOutcome>, StoreError> {
    let users = store.all_users().await?;

    if users.is_empty() {
        warn!("No users in storage; nothing to send");
        return Ok(Vec::new());
    }

    info!(users = users.len(), "Sending weekly digests");

    let mut outcomes = Vec::with_capacity(users.len());
    for user in &users {
        info!(user = %user.name, email = %user.email, "Preparing digest");

        let Some(data) = compose_digest(store, user, today).await? else {
            warn!(email = %user.email, "No active deals for preferred retailers");
            outcomes.push(SendOutcome::failed(
                user.email.clone(),
                user.name.clone(),
                0,
                NO_MATCHING_DEALS.to_owned(),
            ));
            continue;
        };

        let deals_count = data.deals.len();
        info!(deals = deals_count, "Digest composed");

        let delivery = match render_digest(&data, brand) {
            Ok(rendered) => mailer.deliver(&data, &rendered, brand).await,
            Err(e) => Err(e),
        };

        outcomes.push(match delivery {
            Ok(()) => SendOutcome::sent(user.email.clone(), user.name.clone(), deals_count),
            Err(e) => {
                error!(email = %user.email, error = %e, "Digest delivery failed");
                SendOutcome::failed(
                    user.email.clone(),
                    user.name.clone(),
                    deals_count,
                    e.to_string(),
                )
            }
        });
    }

    Ok(outcomes)
}

/// Log the sent/failed tally, with per-user reasons for the failures.
pub fn log_send_summary(outcomes: &[SendOutcome]) {
    let sent = outcomes.iter().filter(|o| o.success).count();
    let failed = outcomes.len() - sent;

    info!("Digest summary");
    info!("  Total users: {}", outcomes.len());
    info!("  Sent: {sent}");
    info!("  Failed: {failed}");

    for outcome in outcomes.iter().filter(|o| !o.success) {
        warn!(
            "  {}: {}",
            outcome.email,
            outcome.error.as_deref().unwrap_or("unknown error")
        );
    }
}

/// Render the HTML digest for one user without delivering it.
///
/// With no email given, previews the first user in storage. Returns `None`
/// when the user does not exist or has no matching deals.
///
/// # Errors
///
/// Returns `PreviewError` if storage or rendering fails.
pub async fn preview_digest_html(
    store: &dyn DealStore,
    user_email: Option<&str>,
    brand: &BrandConfig,
    today: NaiveDate,
) -> Result<Option<String>, PreviewError> {
    let users = store.all_users().await.map_err(PreviewError::Store)?;

    let user = match user_email {
        Some(email) => users.iter().find(|u| u.email.as_str() == email),
        None => users.first(),
    };

    let Some(user) = user else {
        return Ok(None);
    };

    let Some(data) = compose_digest(store, user, today).await? else {
        return Ok(None);
    };

    let rendered = render_digest(&data, brand).map_err(PreviewError::Delivery)?;
    Ok(Some(rendered.html))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dealbird_core::{DealId, Email};
    use rust_decimal::Decimal;

    use crate::services::compose::group_by_retailer;

    use super::*;

    fn enriched(id: i64, retailer: &str, product: &str, cents: i64) -> EnrichedDeal {
        EnrichedDeal {
            id: DealId::new(id),
            retailer_name: retailer.to_owned(),
            product_name: product.to_owned(),
            size: "1L".to_owned(),
            category: "dairy".to_owned(),
            price: Decimal::new(cents, 2),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
        }
    }

    fn email_data(deal_count: i64) -> EmailData {
        let deals: Vec<_> = (1..=deal_count)
            .map(|i| enriched(i, "Acme", &format!("Product {i}"), i * 100))
            .collect();

        EmailData {
            to: Email::parse("jane@example.com").unwrap(),
            user_name: "Jane".to_owned(),
            deals_by_retailer: group_by_retailer(&deals),
            top_deals: deals.clone(),
            deals,
        }
    }

    #[test]
    fn test_render_contains_greeting_and_prices() {
        let rendered = render_digest(&email_data(2), &BrandConfig::default()).unwrap();

        assert!(rendered.html.contains("Hi <strong>Jane</strong>"));
        assert!(rendered.html.contains("$1.00"));
        assert!(rendered.html.contains("$2.00"));
        assert!(rendered.text.contains("Hi Jane!"));
        assert!(rendered.text.contains("Product 1 (1L)"));
    }

    #[test]
    fn test_render_caps_highlight_section_at_six() {
        let rendered = render_digest(&email_data(9), &BrandConfig::default()).unwrap();

        assert!(rendered.html.contains("Top 6 Deals"));
        assert!(rendered.text.contains("TOP 6 DEALS"));
        assert!(!rendered.text.contains("7. Product 7"));
    }

    #[test]
    fn test_render_lists_retailer_sections() {
        let deals = vec![
            enriched(1, "Zest Mart", "Milk", 350),
            enriched(2, "Acme", "Eggs", 420),
        ];
        let data = EmailData {
            to: Email::parse("jane@example.com").unwrap(),
            user_name: "Jane".to_owned(),
            deals_by_retailer: group_by_retailer(&deals),
            top_deals: deals.clone(),
            deals,
        };

        let rendered = render_digest(&data, &BrandConfig::default()).unwrap();
        let acme = rendered.text.find("[Acme]").unwrap();
        let zest = rendered.text.find("[Zest Mart]").unwrap();
        assert!(acme < zest);
    }

    #[tokio::test]
    async fn test_console_delivery_never_fails() {
        let data = email_data(1);
        let rendered = render_digest(&data, &BrandConfig::default()).unwrap();

        let mailer = Mailer::Console;
        assert!(mailer
            .deliver(&data, &rendered, &BrandConfig::default())
            .await
            .is_ok());
    }
}
