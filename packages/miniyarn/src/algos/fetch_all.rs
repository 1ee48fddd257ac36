use std::collections::{BTreeMap, BTreeSet};

use futures::future::join_all;
use miniyarn_primitives::{PackageInfo, PackageLocator};

use crate::{error::{set_timeout, Error}, fetchers::{FetchContext, Fetcher}, handler::Handler, limit::Limit, progress::Progress};

#[derive(Debug, Default)]
pub struct FetchOutcome {
    pub package_infos: BTreeMap<PackageLocator, PackageInfo>,
    pub handlers: BTreeMap<PackageLocator, Handler>,
    pub errors: BTreeMap<PackageLocator, Error>,
}

/// Fetches every locator, at most `limit` at a time. Each fetch has its own
/// timeout, and a failure doesn't prevent the others from completing.
pub async fn fetch_all_packages(locators: &BTreeSet<PackageLocator>, fetcher: &dyn Fetcher, ctx: &FetchContext, limit: &Limit, progress: &dyn Progress) -> FetchOutcome {
    log::info!("Fetching {} package(s)", locators.len());

    progress.add(locators.len());

    let results = join_all(locators.iter().map(|locator| async move {
        let result = limit.run(async {
            set_timeout(ctx.env.fetch_timeout, fetcher.fetch(locator, ctx)).await?
        }).await;

        progress.tick();

        (locator, result)
    })).await;

    let mut outcome
        = FetchOutcome::default();

    for (locator, result) in results {
        match result {
            Ok(result) => {
                outcome.package_infos.insert(locator.clone(), result.package_info);
                outcome.handlers.insert(locator.clone(), result.handler);
            },

            Err(error) => {
                log::debug!("Failed to fetch {}: {}", locator, error);
                outcome.errors.insert(locator.clone(), error);
            },
        }
    }

    outcome
}
