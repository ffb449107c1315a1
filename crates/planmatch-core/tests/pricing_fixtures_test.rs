//! Price-table extraction against realistic document text

use planmatch_core::{extract_pricing, AgeBand, BudgetFilter, DocumentMetadata, SearchDocument};

const OPERATOR_BROCHURE: &str = r#"# Tabela de Preços - Linha Empresarial 2024

Valores mensais por beneficiário, com coparticipação de 30% em consultas.

| Plano | Operadora | 0 a 18 anos | 19 a 38 anos | 39 a 59 anos | 60 a 75 anos | 76 anos ou mais |
| :--- | :--- | ---: | ---: | ---: | ---: | ---: |
| Saúde Bronze | Unimed | R$ 215,40 | R$ 389,90 | R$ 612,00 | R$ 1.102,35 | R$ 1.530,00 |
| Saúde Prata | Unimed | R$ 298,00 | R$ 540,10 | R$ 870,00 | R$ 1.480,00 | - |
| Saúde Ouro | Unimed | R$ 410,00 | R$ 745,00 | R$ 1.190,00 | R$ 2.050,00 | R$ 2.890,00 |

Reajuste anual conforme índice ANS.
"#;

const MIXED_DOCUMENT: &str = "Resumo comercial\r\n\
Plano | Operadora | Mensalidade base\r\n\
Essencial Flex | Hapvida | R$ 279,00\r\n\
Clássico | Hapvida | R$ 1.045,50\r\n";

const WAITING_PERIODS: &str = "\
## Carências e vigência

| Cobertura | Regra | Prazo |
|---|---|---|
| Parto | Carência | 300 |
| Consultas | Vigência | 2024 |
| Internação | Carência | 180 |
";

const NARRATIVE: &str = "O plano cobre consultas e exames. Valores sob consulta com o corretor; \
a mensalidade depende da faixa etária e da região.";

#[test]
fn test_brochure_rows() {
    let plans = extract_pricing(OPERATOR_BROCHURE).unwrap();
    let names: Vec<&str> = plans.iter().map(|p| p.plan_name.as_str()).collect();
    assert_eq!(names, vec!["Saúde Bronze", "Saúde Prata", "Saúde Ouro"]);
    assert!(plans.iter().all(|p| p.operator == "Unimed"));

    let band = AgeBand::from_age(65);
    assert_eq!(plans[0].price_for(band), Some(1102.35));
    assert_eq!(plans[1].price_for(AgeBand::from_age(80)), None);
    assert_eq!(plans[2].price_for(AgeBand::from_age(5)), Some(410.0));
}

#[test]
fn test_base_price_rows_with_crlf() {
    let plans = extract_pricing(MIXED_DOCUMENT).unwrap();
    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0].plan_name, "Essencial Flex");
    assert_eq!(plans[1].price_for(AgeBand::from_age(25)), Some(1045.5));
}

#[test]
fn test_narrative_has_no_prices() {
    assert!(extract_pricing(NARRATIVE).is_none());
}

#[test]
fn test_waiting_period_table_is_not_pricing() {
    assert!(extract_pricing(WAITING_PERIODS).is_none());

    let docs = vec![SearchDocument {
        id: "carencias".to_string(),
        content: WAITING_PERIODS.to_string(),
        score: 0.6,
        metadata: DocumentMetadata::default(),
    }];
    let result = BudgetFilter::new(Some(30), Some(250.0)).filter(&docs);
    assert_eq!(result.counts.compatible, 1);
    assert_eq!(result.counts.incompatible, 0);
    assert_eq!(result.counts.no_price_info, 1);
    assert!(result.counts.filter_applied);
}

#[test]
fn test_filter_over_fixtures() {
    let doc = |id: &str, content: &str| SearchDocument {
        id: id.to_string(),
        content: content.to_string(),
        score: 0.7,
        metadata: DocumentMetadata::default(),
    };
    let docs = vec![
        doc("brochure", OPERATOR_BROCHURE),
        doc("mixed", MIXED_DOCUMENT),
        doc("narrative", NARRATIVE),
    ];

    // 45 years old: band 3, Bronze at R$ 612,00 fits
    let result = BudgetFilter::new(Some(45), Some(650.0)).filter(&docs);
    assert_eq!(result.counts.compatible, 3);
    assert_eq!(result.counts.no_price_info, 2);
    assert_eq!(result.matching_plans["brochure"], vec!["Saúde Bronze (Unimed)"]);

    // 30 years old on R$ 250: every priced plan is over budget
    let result = BudgetFilter::new(Some(30), Some(250.0)).filter(&docs);
    let incompatible: Vec<&str> = result
        .incompatible_docs
        .iter()
        .map(|d| d.id.as_str())
        .collect();
    assert_eq!(incompatible, vec!["brochure", "mixed"]);
    assert_eq!(result.counts.compatible, 1);
}
