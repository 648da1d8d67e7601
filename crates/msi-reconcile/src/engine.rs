use std::collections::BTreeMap;

use crate::{DesiredLink, DuplicateCodePolicy, Link, LinkPatch, LinkPlan, ValidationError};

/// Check every desired record before anything else happens.
///
/// Fail-fast: the first offending record aborts the whole batch. Under
/// [`DuplicateCodePolicy::LastWins`] repeated codes pass and are merged later
/// by [`plan_links`].
pub fn validate_links(
    desired: &[LinkPatch],
    policy: DuplicateCodePolicy,
) -> Result<Vec<DesiredLink<'_>>, ValidationError> {
    let mut first_seen: BTreeMap<&str, usize> = BTreeMap::new();
    let mut out = Vec::with_capacity(desired.len());

    for (index, patch) in desired.iter().enumerate() {
        let source_code = match patch.source_code.as_deref() {
            Some(code) if !code.is_empty() => code,
            _ => return Err(ValidationError::MissingSourceCode { index }),
        };

        match first_seen.get(source_code) {
            Some(&first_index) if policy == DuplicateCodePolicy::Reject => {
                return Err(ValidationError::DuplicateSourceCode {
                    index,
                    first_index,
                    source_code: source_code.to_string(),
                });
            }
            Some(_) => {}
            None => {
                first_seen.insert(source_code, index);
            }
        }

        out.push(DesiredLink {
            index,
            source_code,
            patch,
        });
    }

    Ok(out)
}

/// Replace-strategy diff of `existing` against `desired` for one stock.
///
/// - A desired code that is already persisted reuses that link (identity and
///   unspecified attributes survive); otherwise a new link is started.
/// - The patch is overlaid, then `stock_id` is forced to `stock_id`.
/// - Persisted links whose code is not desired form the delete batch.
/// - Repeated desired codes share one save entry; later patches overlay
///   earlier ones.
///
/// Pure: no IO, same inputs give the same plan.
pub fn plan_links(stock_id: i64, existing: Vec<Link>, desired: &[DesiredLink<'_>]) -> LinkPlan {
    let mut delete_candidates: BTreeMap<String, Link> = existing
        .into_iter()
        .map(|link| (link.source_code.clone(), link))
        .collect();

    let mut save: Vec<Link> = Vec::with_capacity(desired.len());
    let mut slots: BTreeMap<&str, usize> = BTreeMap::new();

    for d in desired {
        let slot = match slots.get(d.source_code) {
            Some(&slot) => slot,
            None => {
                let target = delete_candidates
                    .remove(d.source_code)
                    .unwrap_or_else(|| Link::new(stock_id, d.source_code));
                save.push(target);
                slots.insert(d.source_code, save.len() - 1);
                save.len() - 1
            }
        };

        let link = &mut save[slot];
        d.patch.apply_to(link);
        link.stock_id = stock_id;
    }

    LinkPlan {
        stock_id,
        save,
        delete: delete_candidates.into_values().collect(),
    }
}
