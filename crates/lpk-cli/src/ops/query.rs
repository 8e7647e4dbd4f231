//! Read-only lookups.

use lpk_schema::{LearningApp, LearningUnit, Outcome, PackageId};

use crate::ops::Context;

/// Every imported app, ordered by package identifier.
pub async fn list_apps(ctx: &Context) -> Outcome<Vec<LearningApp>> {
    ctx.db.list_apps().await.into()
}

/// The app record of `package`, or `NotFound`.
pub async fn find_app(ctx: &Context, package: &PackageId) -> Outcome<LearningApp> {
    Outcome::from_lookup(ctx.db.find_app(package).await)
}

/// Units of `package`.
///
/// `NotFound` means the app itself is unknown. A known app without units is
/// `Success` with an empty list, so units can still be added by hand.
pub async fn list_units(ctx: &Context, package: &PackageId) -> Outcome<Vec<LearningUnit>> {
    match ctx.db.find_app(package).await {
        Ok(Some(_)) => ctx.db.units(package).await.into(),
        Ok(None) => Outcome::NotFound,
        Err(e) => Outcome::error(e),
    }
}
