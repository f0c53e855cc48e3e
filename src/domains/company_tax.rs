//! Company tax unit: flat-rate tax with the base rate entity concession.

use crate::domains::{require_company, UnitOutcome};
use crate::entity::EntityId;
use crate::error::EngineError;
use crate::registry::CalcUnit;
use crate::rules::CompanyTaxParams;
use crate::state::CalculationState;
use rust_decimal::Decimal;

/// CAL-CTX-001: taxable income at the base rate when aggregated turnover
/// is under the threshold, otherwise the standard rate
pub fn company_tax(
    state: &CalculationState,
    entity_id: &EntityId,
    params: &CompanyTaxParams,
) -> Result<UnitOutcome, EngineError> {
    let company = require_company(state, CalcUnit::CtxCompanyTax, entity_id)?;

    let (rate, rate_label) = if company.aggregated_turnover < params.base_rate_turnover_threshold {
        (params.base_rate, "base")
    } else {
        (params.standard_rate, "standard")
    };

    let taxable = company.taxable_income.max(Decimal::ZERO);
    let tax = (taxable * rate).round_dp(2);
    Ok(UnitOutcome::info(
        tax,
        format!(
            "taxable income {} at the {} rate {} (turnover {})",
            taxable, rate_label, rate, company.aggregated_turnover
        ),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Company;
    use crate::testutil::person_state;
    use rust_decimal_macros::dec;

    fn with_company(turnover: Decimal, taxable: Decimal) -> CalculationState {
        let mut state = person_state("alex");
        state.entities.companies.insert(
            "opco".into(),
            Company {
                name: "OpCo".to_string(),
                aggregated_turnover: turnover,
                taxable_income: taxable,
            },
        );
        state
    }

    #[test]
    fn small_company_pays_the_base_rate() {
        let state = with_company(dec!(2000000), dec!(150000));
        let params = crate::testutil::company_tax_params_2024_25();

        let outcome = company_tax(&state, &"opco".into(), &params).unwrap();
        assert_eq!(outcome.value, dec!(37500.00));
        assert!(outcome.explanation.contains("base rate"));
    }

    #[test]
    fn large_company_pays_the_standard_rate() {
        let state = with_company(dec!(60000000), dec!(150000));
        let params = crate::testutil::company_tax_params_2024_25();

        let outcome = company_tax(&state, &"opco".into(), &params).unwrap();
        assert_eq!(outcome.value, dec!(45000.00));
    }

    #[test]
    fn losses_produce_no_tax() {
        let state = with_company(dec!(2000000), dec!(-40000));
        let params = crate::testutil::company_tax_params_2024_25();

        let outcome = company_tax(&state, &"opco".into(), &params).unwrap();
        assert_eq!(outcome.value, Decimal::ZERO);
    }

    #[test]
    fn person_is_the_wrong_entity_kind() {
        let state = with_company(dec!(2000000), dec!(150000));
        let params = crate::testutil::company_tax_params_2024_25();

        let err = company_tax(&state, &"alex".into(), &params).unwrap_err();
        assert!(matches!(err, EngineError::CalculationInput { .. }));
    }
}
