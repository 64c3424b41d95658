//! Knowledge base: keyword-searchable FAQs persisted as JSON and the
//! built-in product catalog.

pub mod faq;
pub mod products;

pub use faq::{default_faqs, Faq, FaqAnswer, FaqManager, FaqMatch, FaqUpdate};
pub use products::{Product, ProductCatalog};
