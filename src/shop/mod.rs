//! Add-to-cart flow: gender choice and per-product questions before a line lands in the cart

mod questions;

pub use questions::QuestionFlow;

use crate::checkout::DraftStore;
use crate::core::error::AppResult;
use crate::core::types::Gender;
use crate::storage::cart::{self, NewCartLine};
use crate::storage::{catalog, get_connection, DbPool};

/// Result of an add-to-cart attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added { line_id: i64, product_name: String },
    /// The product needs a gender before it can be added
    NeedGender { product_id: i64, variant_id: Option<i64> },
    /// The product needs a variant before it can be added
    NeedVariant { product_id: i64 },
    AskQuestion { question: String, number: usize, total: usize },
    ProductUnavailable,
}

/// Outcome of a text message routed to the question flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    NotActive,
    Next { question: String, number: usize, total: usize },
    Added { line_id: i64, product_name: String },
}

pub struct Shop {
    pool: DbPool,
    flows: DraftStore<QuestionFlow>,
}

impl Shop {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            flows: DraftStore::new(),
        }
    }

    /// Validates the selection against the catalog and adds it, or asks for what is missing
    pub async fn add(
        &self,
        user: i64,
        product_id: i64,
        variant_id: Option<i64>,
        gender: Option<Gender>,
    ) -> AppResult<AddOutcome> {
        let (product, has_variants, variant_ok) = {
            let conn = get_connection(&self.pool)?;
            let Some(product) = catalog::get_product_by_id(&conn, product_id)? else {
                return Ok(AddOutcome::ProductUnavailable);
            };
            let variants = catalog::get_product_variants(&conn, product_id)?;
            let variant_ok = match variant_id {
                Some(id) => variants.iter().any(|v| v.id == id),
                None => true,
            };
            (product, !variants.is_empty(), variant_ok)
        };

        if product.status != "active" || !variant_ok {
            return Ok(AddOutcome::ProductUnavailable);
        }
        if has_variants && variant_id.is_none() {
            return Ok(AddOutcome::NeedVariant { product_id });
        }
        if product.gender_required && gender.is_none() {
            return Ok(AddOutcome::NeedGender { product_id, variant_id });
        }

        if product.has_questions() {
            let flow = QuestionFlow::new(product_id, variant_id, gender, product.questions.clone());
            let (number, total) = flow.progress();
            let question = flow.current_question().unwrap_or_default().to_string();
            self.flows.put(user, flow).await;
            return Ok(AddOutcome::AskQuestion { question, number, total });
        }

        let line = NewCartLine::product(product_id)
            .with_variant(variant_id)
            .with_gender(gender);
        let line_id = {
            let conn = get_connection(&self.pool)?;
            cart::add_to_cart(&conn, user, &line)?
        };
        log::info!("🛍️ User {} added product {} to the cart", user, product_id);
        Ok(AddOutcome::Added {
            line_id,
            product_name: product.name,
        })
    }

    pub async fn is_answering(&self, user: i64) -> bool {
        self.flows.contains(user).await
    }

    /// Records the next answer; the line is added after the last one
    pub async fn answer(&self, user: i64, text: &str) -> AppResult<AnswerOutcome> {
        let Some(mut flow) = self.flows.get(user).await else {
            return Ok(AnswerOutcome::NotActive);
        };

        if !flow.answer(text) {
            let (number, total) = flow.progress();
            let question = flow.current_question().unwrap_or_default().to_string();
            self.flows.put(user, flow).await;
            return Ok(AnswerOutcome::Next { question, number, total });
        }

        self.flows.discard(user).await;
        let product_id = flow.product_id;
        let line = flow.into_line();
        let (line_id, product_name) = {
            let conn = get_connection(&self.pool)?;
            let line_id = cart::add_to_cart(&conn, user, &line)?;
            let name = catalog::get_product_by_id(&conn, product_id)?
                .map(|p| p.name)
                .unwrap_or_default();
            (line_id, name)
        };
        log::info!("🛍️ User {} added product {} with answers to the cart", user, product_id);
        Ok(AnswerOutcome::Added { line_id, product_name })
    }

    /// Drops a half-answered flow
    pub async fn abort(&self, user: i64) -> bool {
        self.flows.discard(user).await
    }
}
