use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Filing, FilingDate, FilingStatus, FilingType, UtcDateTime};

/// Scored lead derived from one filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prospect {
    /// Same as the filing id.
    pub id: String,
    pub filing: Filing,
    /// 0..=100, higher is a stronger lead.
    pub score: u8,
    pub enriched_at: UtcDateTime,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnrichmentError {
    #[error("filing '{id}' cannot be enriched: {reason}")]
    Rejected { id: String, reason: String },
}

/// Turns one filing into one prospect.
pub trait Enricher: Send + Sync {
    fn enrich(&self, filing: &Filing) -> Result<Prospect, EnrichmentError>;
}

/// Small deterministic score card.
///
/// | Signal | Points |
/// |--------|--------|
/// | base | 20 |
/// | status lapsed / terminated | +30 / +10 |
/// | lien amount >= 100k / >= 25k / > 0 | +25 / +15 / +5 |
/// | filed >= 5 / >= 3 years ago | +15 / +10 |
/// | amendment (ucc3) | -5 |
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreCardEnricher;

impl ScoreCardEnricher {
    pub fn score(filing: &Filing, today: FilingDate) -> u8 {
        let mut score: i32 = 20;

        score += match filing.status {
            FilingStatus::Lapsed => 30,
            FilingStatus::Terminated => 10,
            FilingStatus::Active => 0,
        };

        score += match filing.lien_amount {
            Some(amount) if amount >= 100_000.0 => 25,
            Some(amount) if amount >= 25_000.0 => 15,
            Some(amount) if amount > 0.0 => 5,
            _ => 0,
        };

        let age_days = filing.age_days(today);
        score += if age_days >= 5 * 365 {
            15
        } else if age_days >= 3 * 365 {
            10
        } else {
            0
        };

        if filing.filing_type == FilingType::Ucc3 {
            score -= 5;
        }

        score.clamp(0, 100) as u8
    }
}

impl Enricher for ScoreCardEnricher {
    fn enrich(&self, filing: &Filing) -> Result<Prospect, EnrichmentError> {
        if filing.id.trim().is_empty() {
            return Err(EnrichmentError::Rejected {
                id: filing.id.clone(),
                reason: String::from("filing has no id"),
            });
        }

        let now = UtcDateTime::now();
        Ok(Prospect {
            id: filing.id.clone(),
            filing: filing.clone(),
            score: Self::score(filing, now.date()),
            enriched_at: now,
        })
    }
}
