//! Seeded generator of plausible shopping sessions.

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Bernoulli, Distribution, Exp};
use tracing::{debug, instrument};

use crate::error::SimError;
use crate::session::{Session, VisitorType};

/// Share of labels forced to "purchase" regardless of behavior.
const FORCED_PURCHASE: f64 = 0.02;
/// Draws above this value are forced to "no purchase".
const FORCED_NO_PURCHASE: f64 = 0.95;

/// Configuration for simulating shopping sessions.
///
/// Construct via [`SessionGenerator::new`], then chain `with_*` methods.
/// Two generators with the same configuration produce identical batches.
///
/// # Defaults
///
/// | Parameter         | Default |
/// |-------------------|---------|
/// | `returning_rate`  | 0.7     |
/// | `weekend_rate`    | 0.3     |
/// | `page_value_rate` | 0.1     |
#[derive(Debug, Clone)]
pub struct SessionGenerator {
    seed: u64,
    returning_rate: f64,
    weekend_rate: f64,
    page_value_rate: f64,
}

impl SessionGenerator {
    /// Create a generator with default behavior parameters.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            returning_rate: 0.7,
            weekend_rate: 0.3,
            page_value_rate: 0.1,
        }
    }

    /// Set the probability that a visitor is returning.
    #[must_use]
    pub fn with_returning_rate(mut self, returning_rate: f64) -> Self {
        self.returning_rate = returning_rate;
        self
    }

    /// Set the probability that a session falls on a weekend.
    #[must_use]
    pub fn with_weekend_rate(mut self, weekend_rate: f64) -> Self {
        self.weekend_rate = weekend_rate;
        self
    }

    /// Set the rate of the exponential page-value distribution (before scaling by 5).
    #[must_use]
    pub fn with_page_value_rate(mut self, page_value_rate: f64) -> Self {
        self.page_value_rate = page_value_rate;
        self
    }

    /// Return the random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Simulate `n_sessions` sessions.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`SimError::InvalidProbability`] | a rate is outside `[0.0, 1.0]` |
    /// | [`SimError::InvalidPageValueRate`] | `page_value_rate` is not positive and finite |
    #[instrument(skip(self), fields(seed = self.seed))]
    pub fn generate(&self, n_sessions: usize) -> Result<Vec<Session>, SimError> {
        let returning = bernoulli("returning_rate", self.returning_rate)?;
        let weekend = bernoulli("weekend_rate", self.weekend_rate)?;
        if !(self.page_value_rate.is_finite() && self.page_value_rate > 0.0) {
            return Err(SimError::InvalidPageValueRate {
                rate: self.page_value_rate,
            });
        }
        let page_value = Exp::new(self.page_value_rate).map_err(|_| SimError::InvalidPageValueRate {
            rate: self.page_value_rate,
        })?;

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let sessions: Vec<Session> = (0..n_sessions)
            .map(|_| {
                let mut session = Session {
                    administrative: rng.gen_range(0..=5),
                    product: rng.gen_range(0..=20),
                    information: rng.gen_range(0..=10),
                    bounce_rate: rng.r#gen::<f64>(),
                    exit_rate: rng.r#gen::<f64>(),
                    page_value: page_value.sample(&mut rng) * 5.0,
                    visitor_type: if returning.sample(&mut rng) {
                        VisitorType::Returning
                    } else {
                        VisitorType::New
                    },
                    weekend: u8::from(weekend.sample(&mut rng)),
                    purchase: 0,
                };
                let draw = rng.r#gen::<f64>();
                session.purchase = u8::from(decide_purchase(draw, purchase_probability(&session)));
                session
            })
            .collect();

        debug!(
            n_sessions,
            n_purchases = sessions.iter().filter(|s| s.purchase == 1).count(),
            "sessions generated"
        );
        Ok(sessions)
    }
}

fn bernoulli(parameter: &'static str, value: f64) -> Result<Bernoulli, SimError> {
    Bernoulli::new(value).map_err(|_| SimError::InvalidProbability { parameter, value })
}

/// Purchase probability implied by a session's behavior, clamped to `[0, 1]`.
#[must_use]
pub fn purchase_probability(session: &Session) -> f64 {
    let mut p = session.page_value / 400.0;
    p += f64::from(session.product) * 0.01;
    p += f64::from(session.information) * 0.01;
    p -= session.bounce_rate * 0.3;
    p -= session.exit_rate * 0.2;
    if session.visitor_type == VisitorType::Returning {
        p += 0.30;
    }
    if session.weekend == 1 {
        p += 0.05;
    }
    p.clamp(0.0, 1.0)
}

/// Turn one uniform draw into a label, injecting rare forced outcomes.
fn decide_purchase(draw: f64, probability: f64) -> bool {
    if draw < FORCED_PURCHASE {
        true
    } else if draw > FORCED_NO_PURCHASE {
        false
    } else {
        draw < probability
    }
}
