pub mod spark;
pub mod supabase;

pub use spark::{county_sentiment, CountySentiment};
pub use supabase::SupabaseStore;
