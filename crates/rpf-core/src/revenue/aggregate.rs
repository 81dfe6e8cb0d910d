use crate::diagnostics::Diagnostics;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::types::Money;
use crate::{EngineError, EngineResult};

/// Per-period total revenue. Every revenue stream is summed here and
/// nowhere else.
pub fn total_revenue(contracted: &[Money], merchant: &[Money]) -> EngineResult<Vec<Money>> {
    contracted
        .iter()
        .zip(merchant)
        .enumerate()
        .map(|(t, (c, m))| {
            c.checked_add(*m)
                .ok_or_else(|| EngineError::overflow(format!("total revenue in period {}", t + 1)))
        })
        .collect()
}

pub fn evaluate(
    _inputs: &ObjectInputs,
    deps: &DependencyBundle,
    _diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let contracted = deps.series("contracted_revenue")?;
    let merchant = deps.series_of_len("merchant_revenue", contracted.len())?;

    let mut out = Outputs::new();
    out.insert("total_revenue".into(), total_revenue(contracted, merchant)?.into());
    out.insert("contracted_revenue".into(), contracted.to_vec().into());
    out.insert("merchant_revenue".into(), merchant.to_vec().into());
    Ok(out)
}
