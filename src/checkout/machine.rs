use rust_decimal::Decimal;

use super::step::{CheckoutStep, Contact};
use super::store::DraftStore;
use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::delivery::PickupPointResolver;
use crate::storage::{cart, get_connection, orders, DbPool};

/// What the UI layer should show after a checkout event
#[derive(Debug, Clone, PartialEq)]
pub enum CheckoutReply {
    AskName,
    AskPhone,
    AskPickupAddress,
    AskCity,
    ChooseCity { typed: String, options: Vec<String> },
    AskStreet { city: String },
    ChoosePickupPoint { options: Vec<String> },
    NoPickupPoints { city: String },
    /// `reused` is set when the contact came from the previous order
    AskComment { reused: Option<Contact> },
    PaymentInstructions { total: Decimal },
    PhotoRequired,
    OrderCreated { order_id: i64, total: Decimal },
    CartEmpty,
    Cancelled,
    Failed,
    /// The event does not belong to an active checkout
    Ignored,
}

/// Per-user checkout conversation.
///
/// Updates of one chat arrive one at a time, so a step is read, advanced and written
/// back without holding the store lock across database or resolver calls.
pub struct Checkout<R> {
    pool: DbPool,
    resolver: R,
    lookup_enabled: bool,
    drafts: DraftStore<CheckoutStep>,
}

impl<R: PickupPointResolver> Checkout<R> {
    pub fn new(pool: DbPool, resolver: R, lookup_enabled: bool) -> Self {
        Self {
            pool,
            resolver,
            lookup_enabled,
            drafts: DraftStore::new(),
        }
    }

    pub async fn is_active(&self, user: i64) -> bool {
        self.drafts.contains(user).await
    }

    pub async fn awaiting_photo(&self, user: i64) -> bool {
        matches!(self.drafts.get(user).await, Some(CheckoutStep::PaymentProof { .. }))
    }

    /// Starts (or restarts) checkout for the user
    pub async fn start(&self, user: i64) -> CheckoutReply {
        match self.try_start(user).await {
            Ok(reply) => reply,
            Err(e) => self.fail(user, "start", e).await,
        }
    }

    async fn try_start(&self, user: i64) -> AppResult<CheckoutReply> {
        let (empty, previous) = {
            let conn = get_connection(&self.pool)?;
            (
                cart::is_cart_empty(&conn, user)?,
                orders::get_latest_order_for_user(&conn, user)?,
            )
        };
        if empty {
            self.drafts.discard(user).await;
            return Ok(CheckoutReply::CartEmpty);
        }

        if let Some(contact) = previous
            .as_ref()
            .and_then(|order| Contact::from_previous_order(order, self.lookup_enabled))
        {
            log::info!("🛒 Checkout started for user {} with contact of the previous order", user);
            self.drafts
                .put(
                    user,
                    CheckoutStep::Comment {
                        contact: contact.clone(),
                    },
                )
                .await;
            return Ok(CheckoutReply::AskComment { reused: Some(contact) });
        }

        log::info!("🛒 Checkout started for user {}", user);
        self.drafts.put(user, CheckoutStep::Name).await;
        Ok(CheckoutReply::AskName)
    }

    /// Text message from a user; `Ignored` when no checkout is active
    pub async fn handle_text(&self, user: i64, text: &str) -> CheckoutReply {
        let Some(step) = self.drafts.get(user).await else {
            return CheckoutReply::Ignored;
        };
        match self.try_handle_text(user, step, text.trim()).await {
            Ok(reply) => reply,
            Err(e) => self.fail(user, "text", e).await,
        }
    }

    async fn try_handle_text(&self, user: i64, step: CheckoutStep, text: &str) -> AppResult<CheckoutReply> {
        if self.cart_emptied(user).await? {
            return Ok(CheckoutReply::CartEmpty);
        }
        if text.is_empty() {
            return Ok(prompt_for(&step));
        }

        let (next, reply) = match step {
            CheckoutStep::Name => {
                let name = text.to_string();
                if self.lookup_enabled {
                    (CheckoutStep::City { name }, CheckoutReply::AskCity)
                } else {
                    (CheckoutStep::Phone { name }, CheckoutReply::AskPhone)
                }
            }
            CheckoutStep::Phone { name } => (
                CheckoutStep::PickupAddress {
                    name,
                    phone: text.to_string(),
                },
                CheckoutReply::AskPickupAddress,
            ),
            CheckoutStep::PickupAddress { name, phone } => {
                let contact = Contact {
                    name,
                    phone: Some(phone),
                    city: text.to_string(),
                    pickup_label: Some(text.to_string()),
                    ..Default::default()
                };
                (CheckoutStep::Comment { contact }, CheckoutReply::AskComment { reused: None })
            }
            CheckoutStep::City { name } => self.detect_city(user, name, text).await,
            step @ CheckoutStep::CityChoice { .. } => {
                let reply = prompt_for(&step);
                (step, reply)
            }
            CheckoutStep::Street { name, city, geo_id } | CheckoutStep::StreetChoice { name, city, geo_id, .. } => {
                self.find_pickup_points(user, name, city, geo_id, text).await
            }
            CheckoutStep::Comment { contact } => {
                let comment = if is_no_comment(text) { String::new() } else { text.to_string() };
                return self.enter_payment(user, contact, comment).await;
            }
            step @ CheckoutStep::PaymentProof { .. } => (step, CheckoutReply::PhotoRequired),
        };

        self.drafts.put(user, next).await;
        Ok(reply)
    }

    /// City detection; zero candidates or an unavailable resolver keep the typed text
    async fn detect_city(&self, user: i64, name: String, typed: &str) -> (CheckoutStep, CheckoutReply) {
        let candidates = match self.resolver.detect_city(typed).await {
            Ok(candidates) => candidates,
            Err(e) => {
                log::warn!("📍 City lookup failed for user {}, keeping typed city: {}", user, e);
                Vec::new()
            }
        };

        if candidates.is_empty() {
            let contact = Contact {
                name,
                city: typed.to_string(),
                ..Default::default()
            };
            return (CheckoutStep::Comment { contact }, CheckoutReply::AskComment { reused: None });
        }

        let candidates: Vec<_> = candidates.into_iter().take(config::checkout::MAX_CHOICES).collect();
        let options = candidates.iter().map(|c| c.label.clone()).collect();
        (
            CheckoutStep::CityChoice {
                name,
                typed: typed.to_string(),
                candidates,
            },
            CheckoutReply::ChooseCity {
                typed: typed.to_string(),
                options,
            },
        )
    }

    async fn find_pickup_points(
        &self,
        user: i64,
        name: String,
        city: String,
        geo_id: i64,
        street: &str,
    ) -> (CheckoutStep, CheckoutReply) {
        match self.resolver.list_pickup_points(geo_id, street).await {
            Ok(points) if points.is_empty() => {
                let reply = CheckoutReply::NoPickupPoints { city: city.clone() };
                (CheckoutStep::Street { name, city, geo_id }, reply)
            }
            Ok(points) => {
                let points: Vec<_> = points.into_iter().take(config::checkout::MAX_CHOICES).collect();
                let options = points.iter().map(|p| p.label.clone()).collect();
                (
                    CheckoutStep::StreetChoice {
                        name,
                        city,
                        geo_id,
                        points,
                    },
                    CheckoutReply::ChoosePickupPoint { options },
                )
            }
            Err(e) => {
                log::warn!("📦 Pickup-point lookup failed for user {}, continuing without one: {}", user, e);
                let contact = Contact {
                    name,
                    city,
                    geo_id: Some(geo_id),
                    ..Default::default()
                };
                (CheckoutStep::Comment { contact }, CheckoutReply::AskComment { reused: None })
            }
        }
    }

    /// Inline choice of a detected city; `None` keeps the typed text
    pub async fn choose_city(&self, user: i64, choice: Option<usize>) -> CheckoutReply {
        let Some(step) = self.drafts.get(user).await else {
            return CheckoutReply::Ignored;
        };
        let CheckoutStep::CityChoice { name, typed, candidates } = step else {
            return CheckoutReply::Ignored;
        };

        let (city, geo_id) = match choice {
            Some(idx) => match candidates.get(idx) {
                Some(candidate) => (candidate.label.clone(), candidate.geo_id),
                None => {
                    let options = candidates.iter().map(|c| c.label.clone()).collect();
                    return CheckoutReply::ChooseCity { typed, options };
                }
            },
            // the typed text is kept, the best match still scopes the pickup-point search
            None => match candidates.first() {
                Some(best) => (typed.clone(), best.geo_id),
                None => return CheckoutReply::Ignored,
            },
        };

        self.drafts
            .put(
                user,
                CheckoutStep::Street {
                    name,
                    city: city.clone(),
                    geo_id,
                },
            )
            .await;
        CheckoutReply::AskStreet { city }
    }

    /// Inline choice of a pickup point; `None` skips it
    pub async fn choose_pickup_point(&self, user: i64, choice: Option<usize>) -> CheckoutReply {
        let Some(step) = self.drafts.get(user).await else {
            return CheckoutReply::Ignored;
        };

        let contact = match (step, choice) {
            (CheckoutStep::StreetChoice { name, city, geo_id, points }, Some(idx)) => match points.get(idx) {
                Some(point) => Contact {
                    name,
                    city,
                    pickup_label: Some(point.label.clone()),
                    pickup_id: Some(point.pickup_id.clone()),
                    geo_id: Some(geo_id),
                    ..Default::default()
                },
                None => {
                    let options = points.iter().map(|p| p.label.clone()).collect();
                    return CheckoutReply::ChoosePickupPoint { options };
                }
            },
            (CheckoutStep::StreetChoice { name, city, geo_id, .. }, None)
            | (CheckoutStep::Street { name, city, geo_id }, None) => Contact {
                name,
                city,
                geo_id: Some(geo_id),
                ..Default::default()
            },
            _ => return CheckoutReply::Ignored,
        };

        self.drafts.put(user, CheckoutStep::Comment { contact }).await;
        CheckoutReply::AskComment { reused: None }
    }

    /// "No comment" button
    pub async fn skip_comment(&self, user: i64) -> CheckoutReply {
        let Some(CheckoutStep::Comment { contact }) = self.drafts.get(user).await else {
            return CheckoutReply::Ignored;
        };
        match self.try_skip_comment(user, contact).await {
            Ok(reply) => reply,
            Err(e) => self.fail(user, "skip_comment", e).await,
        }
    }

    async fn try_skip_comment(&self, user: i64, contact: Contact) -> AppResult<CheckoutReply> {
        if self.cart_emptied(user).await? {
            return Ok(CheckoutReply::CartEmpty);
        }
        self.enter_payment(user, contact, String::new()).await
    }

    async fn enter_payment(&self, user: i64, contact: Contact, comment: String) -> AppResult<CheckoutReply> {
        let total = {
            let conn = get_connection(&self.pool)?;
            cart::get_cart_total(&conn, user)?
        };
        self.drafts.put(user, CheckoutStep::PaymentProof { contact, comment }).await;
        Ok(CheckoutReply::PaymentInstructions { total })
    }

    /// Message checkout cannot read (document, sticker, voice); repeats the current question
    pub async fn handle_unsupported(&self, user: i64) -> CheckoutReply {
        match self.drafts.get(user).await {
            Some(step) => prompt_for(&step),
            None => CheckoutReply::Ignored,
        }
    }

    /// Payment screenshot; creates the order when the proof is expected
    pub async fn handle_photo(&self, user: i64, proof_url: &str) -> CheckoutReply {
        let Some(step) = self.drafts.get(user).await else {
            return CheckoutReply::Ignored;
        };
        match self.try_handle_photo(user, step, proof_url).await {
            Ok(reply) => reply,
            Err(AppError::EmptyCart) => {
                self.drafts.discard(user).await;
                CheckoutReply::CartEmpty
            }
            Err(e) => self.fail(user, "photo", e).await,
        }
    }

    async fn try_handle_photo(&self, user: i64, step: CheckoutStep, proof_url: &str) -> AppResult<CheckoutReply> {
        if self.cart_emptied(user).await? {
            return Ok(CheckoutReply::CartEmpty);
        }
        let CheckoutStep::PaymentProof { contact, comment } = step else {
            return Ok(prompt_for(&step));
        };

        let draft = contact.into_order_draft(comment, proof_url.to_string());
        let order = {
            let mut conn = get_connection(&self.pool)?;
            orders::create_order_from_cart(&mut conn, user, &draft)?
        };
        self.drafts.discard(user).await;
        Ok(CheckoutReply::OrderCreated {
            order_id: order.id,
            total: order.total_amount,
        })
    }

    /// Cancel button; honored from the comment and payment steps only, the cart stays
    pub async fn cancel(&self, user: i64) -> CheckoutReply {
        match self.drafts.get(user).await {
            Some(step) if step.can_cancel() => {
                self.drafts.discard(user).await;
                log::info!("🚫 Checkout cancelled by user {} at step {}", user, step.as_str());
                CheckoutReply::Cancelled
            }
            _ => CheckoutReply::Ignored,
        }
    }

    /// Drops any draft (the /cancel command); returns whether one existed
    pub async fn abort(&self, user: i64) -> bool {
        let existed = self.drafts.discard(user).await;
        if existed {
            log::info!("🚫 Checkout aborted by user {}", user);
        }
        existed
    }

    /// Discards the draft when the cart became empty mid-flow
    async fn cart_emptied(&self, user: i64) -> AppResult<bool> {
        let empty = {
            let conn = get_connection(&self.pool)?;
            cart::is_cart_empty(&conn, user)?
        };
        if empty {
            log::info!("🛒 Cart of user {} is empty, checkout draft discarded", user);
            self.drafts.discard(user).await;
        }
        Ok(empty)
    }

    async fn fail(&self, user: i64, stage: &str, err: AppError) -> CheckoutReply {
        log::error!("Checkout {} failed for user {}: {}", stage, user, err);
        self.drafts.discard(user).await;
        CheckoutReply::Failed
    }
}

fn is_no_comment(text: &str) -> bool {
    let lowered = text.to_lowercase();
    config::checkout::NO_COMMENT_WORDS.contains(&lowered.as_str())
}

/// Repeats the question of the current step
fn prompt_for(step: &CheckoutStep) -> CheckoutReply {
    match step {
        CheckoutStep::Name => CheckoutReply::AskName,
        CheckoutStep::Phone { .. } => CheckoutReply::AskPhone,
        CheckoutStep::PickupAddress { .. } => CheckoutReply::AskPickupAddress,
        CheckoutStep::City { .. } => CheckoutReply::AskCity,
        CheckoutStep::CityChoice { typed, candidates, .. } => CheckoutReply::ChooseCity {
            typed: typed.clone(),
            options: candidates.iter().map(|c| c.label.clone()).collect(),
        },
        CheckoutStep::Street { city, .. } => CheckoutReply::AskStreet { city: city.clone() },
        CheckoutStep::StreetChoice { points, .. } => CheckoutReply::ChoosePickupPoint {
            options: points.iter().map(|p| p.label.clone()).collect(),
        },
        CheckoutStep::Comment { .. } => CheckoutReply::AskComment { reused: None },
        CheckoutStep::PaymentProof { .. } => CheckoutReply::PhotoRequired,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_comment_words() {
        assert!(is_no_comment("Нет"));
        assert!(is_no_comment("no"));
        assert!(is_no_comment("-"));
        assert!(!is_no_comment("нет, позвоните"));
    }

    #[test]
    fn test_prompt_repeats_payment_reminder() {
        let step = CheckoutStep::PaymentProof {
            contact: Contact::default(),
            comment: String::new(),
        };
        assert_eq!(prompt_for(&step), CheckoutReply::PhotoRequired);
        assert_eq!(prompt_for(&CheckoutStep::Name), CheckoutReply::AskName);
    }
}
