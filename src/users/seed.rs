//! Bulk population of the user store with synthetic records.
//!
//! Seeding runs at most once per store: if any record is already present the
//! run is skipped. Records are generated and inserted in sequential batches;
//! each batch is an unordered bulk insert, so a row that collides with
//! existing data is dropped without failing its siblings. Only a store
//! failure aborts the run, and batches already written stay in place.

use std::sync::Arc;
use std::time::{Duration, Instant};

use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use time::{Date, OffsetDateTime};
use tracing::{error, info, warn};

use super::error::UserError;
use super::model::NewUser;
use super::store::UserStore;
use crate::config::SeedSettings;

/// Base for synthetic phone numbers; the generation index is added to it.
pub const PHONE_BASE: u64 = 380_000_000_000;

/// Generated users are between these ages (inclusive) on the day of the run.
const MIN_AGE_YEARS: i32 = 18;
const MAX_AGE_YEARS: i32 = 70;

/// Size and batching of one seeding run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedRequest {
    pub total_count: u64,
    pub batch_size: u64,
}

impl SeedRequest {
    pub fn batches(&self) -> u64 {
        self.total_count.div_ceil(self.batch_size)
    }
}

impl From<&SeedSettings> for SeedRequest {
    fn from(s: &SeedSettings) -> Self {
        Self {
            total_count: s.total_count,
            batch_size: s.batch_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub batches: u64,
    pub generated: u64,
    pub inserted: u64,
    pub skipped: u64,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    Applied(SeedReport),
    AlreadySeeded,
}

pub struct Seeder {
    store: Arc<dyn UserStore>,
    rng_seed: Option<u64>,
}

impl Seeder {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            store,
            rng_seed: None,
        }
    }

    /// Fixes the random source so runs are reproducible.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// True when the store holds no records yet.
    pub async fn should_seed(&self) -> Result<bool, UserError> {
        Ok(!self.store.exists_any().await?)
    }

    pub async fn run(&self, request: SeedRequest) -> Result<SeedOutcome, UserError> {
        if request.batch_size == 0 {
            return Err(UserError::InvalidArgument("batch size must be positive".into()));
        }

        if !self.should_seed().await.map_err(|e| {
            error!(error = %e, "seed emptiness check failed");
            e
        })? {
            info!("seed skip db_not_empty");
            return Ok(SeedOutcome::AlreadySeeded);
        }

        let started = Instant::now();
        let batches = request.batches();
        info!(
            total = request.total_count,
            batch_size = request.batch_size,
            batches,
            "seed start db_empty"
        );

        let mut rng = match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let today = OffsetDateTime::now_utc().date();
        let mut unique_index = 0u64;
        let mut inserted = 0u64;
        let mut skipped = 0u64;

        for batch_no in 1..=batches {
            let size = request.batch_size.min(request.total_count - unique_index);
            let mut batch = Vec::with_capacity(size as usize);
            for _ in 0..size {
                batch.push(generate_user(&mut rng, unique_index, today));
                unique_index += 1;
            }

            let outcome = self
                .store
                .insert_many_unordered(&batch)
                .await
                .map_err(|e| {
                    error!(error = %e, batch = batch_no, batches, inserted, "seed aborted");
                    UserError::from(e)
                })?;
            inserted += outcome.inserted;
            skipped += outcome.skipped;

            if outcome.skipped > 0 {
                warn!(batch = batch_no, skipped = outcome.skipped, "seed batch had conflicting rows");
            }
            info!(batch = batch_no, batches, inserted = outcome.inserted, "seed progress");
        }

        let elapsed = started.elapsed();
        info!(
            total = unique_index,
            inserted,
            skipped,
            seconds = elapsed.as_secs_f64().ceil(),
            "seed done"
        );
        Ok(SeedOutcome::Applied(SeedReport {
            batches,
            generated: unique_index,
            inserted,
            skipped,
            elapsed,
        }))
    }
}

/// Runs the seeder when startup seeding is enabled. When disabled the store
/// is not touched at all.
pub async fn seed_on_startup(
    settings: &SeedSettings,
    store: Arc<dyn UserStore>,
) -> Result<Option<SeedOutcome>, UserError> {
    if !settings.enabled {
        info!(reason = "disabled", "seed skipped");
        return Ok(None);
    }
    let mut seeder = Seeder::new(store);
    if let Some(seed) = settings.rng_seed {
        info!(rng_seed = seed, "seed using fixed rng");
        seeder = seeder.with_rng_seed(seed);
    }
    seeder
        .run(SeedRequest::from(settings))
        .await
        .map(Some)
}

/// Builds one synthetic user. `index` makes phone and email unique even when
/// the random parts repeat.
pub fn generate_user<R: Rng>(rng: &mut R, index: u64, today: Date) -> NewUser {
    let name: String = Name().fake_with_rng(rng);
    let email: String = SafeEmail().fake_with_rng(rng);
    let latest = years_before(today, MIN_AGE_YEARS);
    let earliest = years_before(today, MAX_AGE_YEARS + 1)
        .next_day()
        .unwrap_or(latest);
    let span = (latest - earliest).whole_days().max(0);
    let birth_date = earliest
        .checked_add(time::Duration::days(rng.gen_range(0..=span)))
        .unwrap_or(latest);

    NewUser {
        name,
        email: format!("{index}-{email}"),
        phone: format!("+{}", PHONE_BASE + index),
        birth_date,
    }
}

/// Same calendar day `years` earlier; Feb 29 falls back to Feb 28.
fn years_before(today: Date, years: i32) -> Date {
    let year = today.year() - years;
    today
        .replace_year(year)
        .or_else(|_| today.replace_day(28).and_then(|d| d.replace_year(year)))
        .unwrap_or(Date::MIN)
}
