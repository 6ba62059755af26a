//! The built-in catalog used when no sheet or CSV source is configured.

use crate::types::{Catalog, CatalogRow};

const SEED_ROWS: &[(&str, &str, &str, i64, &str)] = &[
    (
        "Bolt X",
        "Hexagon head bolt with nut for structural joints",
        "steel",
        73181510,
        "M8 x 40 mm, zinc plated, grade 8.8",
    ),
    (
        "Wood Screw W2",
        "Countersunk self-tapping screw for timber",
        "steel",
        73181200,
        "4 x 30 mm, yellow passivated",
    ),
    (
        "Flat Washer F10",
        "Plain round washer distributing bolt load",
        "stainless steel",
        73182200,
        "10.5 mm inner diameter, A2",
    ),
    (
        "Cable Tie CT200",
        "Self-locking strap for bundling cables",
        "nylon",
        39269097,
        "200 x 4.8 mm, UV resistant, black",
    ),
    (
        "Hinge H75",
        "Butt hinge for cabinet and interior doors",
        "brass",
        83021000,
        "75 x 50 mm, pair with screws",
    ),
    (
        "Copper Wire C1",
        "Insulated single-core copper conductor",
        "copper",
        85444993,
        "1.5 mm2, PVC sheath, 100 m reel",
    ),
];

/// Returns the built-in catalog.
pub fn seed_catalog() -> Catalog {
    Catalog::new(
        SEED_ROWS
            .iter()
            .map(
                |&(product_name, definition, material, hs_code, specifications)| CatalogRow {
                    product_name: product_name.to_string(),
                    definition: definition.to_string(),
                    material: material.to_string(),
                    hs_code,
                    specifications: specifications.to_string(),
                },
            )
            .collect(),
    )
}
