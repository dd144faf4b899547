//! Built-in source definitions embedded in the binary
//!
//! This module embeds the preset YAML files directly into the binary,
//! allowing users to use `--source shopify` instead of specifying a file path.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Built-in source YAML definitions
pub static BUILTIN_SOURCES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    // E-commerce
    m.insert("shopify", include_str!("../connectors/shopify.yaml"));
    m.insert(
        "shopify-graphql",
        include_str!("../connectors/shopify-graphql.yaml"),
    );
    m.insert("faire", include_str!("../connectors/faire.yaml"));

    // Fulfilment & returns
    m.insert("shiphero", include_str!("../connectors/shiphero.yaml"));
    m.insert("loop-returns", include_str!("../connectors/loop-returns.yaml"));
    m.insert("loop", include_str!("../connectors/loop-returns.yaml"));

    m
});

/// Get a built-in source YAML by name
pub fn get_builtin(name: &str) -> Option<&'static str> {
    BUILTIN_SOURCES.get(name).copied()
}

/// Check if a name refers to a built-in source
pub fn is_builtin(name: &str) -> bool {
    BUILTIN_SOURCES.contains_key(name)
}

/// Canonical built-in source names (aliases omitted)
pub fn list_builtin() -> Vec<&'static str> {
    list_builtin_info().iter().map(|info| info.name).collect()
}

/// Source metadata for display
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub aliases: &'static [&'static str],
    pub config_schema: &'static [ConfigField],
    pub streams: &'static [&'static str],
}

/// A value the source reads from the environment or `--config-json`
#[derive(Debug, Clone)]
pub struct ConfigField {
    /// `env.X` or `config.x`
    pub name: &'static str,
    pub required: bool,
    pub secret: bool,
    pub description: &'static str,
}

const START_DATE: ConfigField = ConfigField {
    name: "config.start_date",
    required: false,
    secret: false,
    description: "Start of the updated-since window (YYYY-MM-DD or RFC 3339)",
};

const SHOPIFY_SHOP: ConfigField = ConfigField {
    name: "config.shop",
    required: true,
    secret: false,
    description: "Shop subdomain (acme for acme.myshopify.com)",
};

const SHOPIFY_TOKEN: ConfigField = ConfigField {
    name: "env.SHOPIFY_ACCESS_TOKEN",
    required: true,
    secret: true,
    description: "Admin API access token",
};

/// Get detailed info about all built-in sources
pub fn list_builtin_info() -> Vec<SourceInfo> {
    vec![
        SourceInfo {
            name: "shopify",
            description: "Shopify orders, customers and products (Admin REST API)",
            aliases: &[],
            config_schema: &[SHOPIFY_SHOP, SHOPIFY_TOKEN, START_DATE],
            streams: &["orders", "customers", "products"],
        },
        SourceInfo {
            name: "shopify-graphql",
            description: "Shopify products and inventory (Admin GraphQL API)",
            aliases: &[],
            config_schema: &[SHOPIFY_SHOP, SHOPIFY_TOKEN],
            streams: &["products", "inventory_items"],
        },
        SourceInfo {
            name: "shiphero",
            description: "ShipHero orders, products and shipments (GraphQL)",
            aliases: &[],
            config_schema: &[
                ConfigField {
                    name: "env.SHIPHERO_REFRESH_TOKEN",
                    required: true,
                    secret: true,
                    description: "Refresh token used to obtain access tokens",
                },
                START_DATE,
            ],
            streams: &["orders", "products", "shipments"],
        },
        SourceInfo {
            name: "faire",
            description: "Faire wholesale orders and products",
            aliases: &[],
            config_schema: &[
                ConfigField {
                    name: "env.FAIRE_APP_ID",
                    required: true,
                    secret: false,
                    description: "Application id",
                },
                ConfigField {
                    name: "env.FAIRE_APP_SECRET",
                    required: true,
                    secret: true,
                    description: "Application secret",
                },
                ConfigField {
                    name: "env.FAIRE_ACCESS_TOKEN",
                    required: true,
                    secret: true,
                    description: "OAuth access token for the brand",
                },
                START_DATE,
            ],
            streams: &["orders", "products"],
        },
        SourceInfo {
            name: "loop-returns",
            description: "Loop Returns returns and line items",
            aliases: &["loop"],
            config_schema: &[
                ConfigField {
                    name: "env.LOOP_API_KEY",
                    required: true,
                    secret: true,
                    description: "API key with the Reporting scope",
                },
                START_DATE,
            ],
            streams: &["returns"],
        },
    ]
}
