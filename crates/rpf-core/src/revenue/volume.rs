use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostics;
use crate::inputs::{DependencyBundle, ObjectInputs, Outputs};
use crate::time_value;
use crate::types::{Energy, Rate};
use crate::{EngineError, EngineResult};

const DAYS_PER_YEAR: Decimal = dec!(365);

/// Battery dispatch assumptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeInput {
    pub rated_power_mw: Decimal,
    pub duration_hours: Decimal,
    pub cycles_per_day: Decimal,
    /// Fraction of the year the asset is available (0-1)
    pub availability_factor: Decimal,
    /// Annual capacity fade (decimal)
    pub degradation_rate: Rate,
    /// Absent means charge volume is reported equal to discharge
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_trip_efficiency: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeYear {
    pub operating_year: u32,
    pub annual_discharge_mwh: Energy,
    pub annual_charge_mwh: Energy,
}

impl VolumeInput {
    pub fn from_inputs(inputs: &ObjectInputs) -> EngineResult<Self> {
        let input = Self {
            rated_power_mw: inputs.number("rated_power_mw")?,
            duration_hours: inputs.number("duration_hours")?,
            cycles_per_day: inputs.number("cycles_per_day")?,
            availability_factor: inputs.number("availability_factor")?,
            degradation_rate: inputs.number("degradation_rate")?,
            round_trip_efficiency: inputs.optional_number("round_trip_efficiency")?,
        };

        for (field, value) in [
            ("rated_power_mw", input.rated_power_mw),
            ("duration_hours", input.duration_hours),
            ("cycles_per_day", input.cycles_per_day),
        ] {
            if value < Decimal::ZERO {
                return Err(inputs.invalid(field, "cannot be negative"));
            }
        }
        if input.availability_factor < Decimal::ZERO || input.availability_factor > Decimal::ONE {
            return Err(inputs.invalid("availability_factor", "must be between 0 and 1"));
        }
        if input.degradation_rate < Decimal::ZERO || input.degradation_rate >= Decimal::ONE {
            return Err(inputs.invalid("degradation_rate", "must be in [0, 1)"));
        }
        if let Some(eff) = input.round_trip_efficiency {
            if eff < Decimal::ZERO || eff > Decimal::ONE {
                return Err(inputs.invalid("round_trip_efficiency", "must be between 0 and 1"));
            }
        }
        Ok(input)
    }
}

/// Energy discharged (and the implied grid charge) in one operating year.
///
/// Full precision is kept; rounding to whole MWh is a display concern.
pub fn annual_volume(input: &VolumeInput, operating_year: u32) -> EngineResult<VolumeYear> {
    let overflow = || EngineError::overflow(format!("discharge volume in operating year {operating_year}"));

    let gross_discharge = input
        .rated_power_mw
        .checked_mul(input.duration_hours)
        .and_then(|e| e.checked_mul(input.cycles_per_day))
        .and_then(|e| e.checked_mul(DAYS_PER_YEAR))
        .ok_or_else(overflow)?;
    let faded = time_value::escalate(
        gross_discharge,
        -input.degradation_rate,
        i64::from(operating_year) - 1,
    )?;
    let annual_discharge_mwh = faded * input.availability_factor;

    let annual_charge_mwh = match input.round_trip_efficiency {
        Some(eff) if eff.is_zero() => Decimal::ZERO,
        Some(eff) => annual_discharge_mwh.checked_div(eff).ok_or_else(overflow)?,
        None => annual_discharge_mwh,
    };

    Ok(VolumeYear {
        operating_year,
        annual_discharge_mwh,
        annual_charge_mwh,
    })
}

pub fn evaluate(
    inputs: &ObjectInputs,
    deps: &DependencyBundle,
    diag: &mut Diagnostics,
) -> EngineResult<Outputs> {
    let input = VolumeInput::from_inputs(inputs)?;
    let years = deps.count("operating_years")?;

    if input.round_trip_efficiency == Some(Decimal::ZERO) {
        diag.guard(
            inputs.object(),
            "round_trip_efficiency",
            "round-trip efficiency is zero; annual charge reported as 0",
        );
    }

    let rows = (1..=years)
        .map(|y| annual_volume(&input, y))
        .collect::<EngineResult<Vec<_>>>()?;
    let (discharge, charge): (Vec<_>, Vec<_>) = rows
        .iter()
        .map(|v| (v.annual_discharge_mwh, v.annual_charge_mwh))
        .unzip();

    let mut out = Outputs::new();
    out.insert("annual_discharge_mwh".into(), discharge.into());
    out.insert("annual_charge_mwh".into(), charge.into());
    Ok(out)
}
