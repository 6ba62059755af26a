//! # Grounding Prompt Tests
//!
//! Validates `hslookup::prompts::core::build_grounding_prompt`: the rendered product
//! blocks, the dialect epilogue and the determinism of the output.

mod common;

use common::{bolt_catalog, sample_catalog};
use hslookup::prompts::core::{build_grounding_prompt, format_product_block};
use hslookup::{Catalog, QueryDialect};

#[test]
fn test_prompt_is_deterministic() {
    let catalog = sample_catalog();
    let first = build_grounding_prompt(&catalog, QueryDialect::Tabular);
    let second = build_grounding_prompt(&catalog, QueryDialect::Tabular);
    assert_eq!(first, second);
}

#[test]
fn test_every_row_is_rendered_with_all_labels() {
    let catalog = sample_catalog();
    let prompt = build_grounding_prompt(&catalog, QueryDialect::Tabular);

    for row in catalog.rows() {
        assert!(prompt.contains(&format_product_block(row)));
    }
    assert_eq!(prompt.matches("* HS Code: ").count(), catalog.len());
    assert!(prompt.contains("Bolt X\n* Definition: A bolt x\n* Material: steel\n* HS Code: 73181510\n* Specifications: standard\n"));
}

#[test]
fn test_empty_catalog_yields_valid_prompt() {
    let prompt = build_grounding_prompt(&Catalog::empty(), QueryDialect::Tabular);

    assert!(prompt.contains("Jarvis"));
    assert!(prompt.contains("Product List:"));
    assert!(!prompt.contains("* Definition:"));
    assert!(prompt.contains("Do not use backticks."));
}

#[test]
fn test_tabular_dialect_examples() {
    let prompt = build_grounding_prompt(&bolt_catalog(), QueryDialect::Tabular);

    assert!(prompt.contains("'Product Name', 'Definition', 'Material', 'HS Code', 'Specifications'"));
    assert!(prompt.contains("data.shape[0]"));
    assert!(prompt.contains("data[data['Material'] == 'steel']"));
    assert!(!prompt.contains("SELECT"));
}

#[test]
fn test_sql_dialect_examples() {
    let prompt = build_grounding_prompt(&bolt_catalog(), QueryDialect::Sql);

    assert!(prompt.contains("product_name, definition, material, hs_code, specifications"));
    assert!(prompt.contains("SELECT COUNT(*) FROM catalog"));
    assert!(prompt.contains("SELECT * FROM catalog WHERE material = 'steel'"));
    assert!(!prompt.contains("data.shape[0]"));
}

#[test]
fn test_catalog_precedes_instructions() {
    let prompt = build_grounding_prompt(&bolt_catalog(), QueryDialect::Tabular);
    let product = prompt.find("Bolt X").unwrap();
    let persona = prompt.find("Product List:").unwrap();
    let examples = prompt.find("For example:").unwrap();
    assert!(persona < product && product < examples);
}

#[test]
fn test_instructions_contain_no_backticks() {
    for dialect in [QueryDialect::Tabular, QueryDialect::Sql] {
        let prompt = build_grounding_prompt(&sample_catalog(), dialect);
        assert_eq!(prompt.matches('`').count(), 0, "{dialect:?} prompt");
    }
}
