//! Per-client, per-service-type price table and resolution rules.

use std::collections::BTreeMap;

/// Key of the per-client catch-all price.
pub const DEFAULT_KEY: &str = "default";

/// Last-resort base price when nothing else resolves.
pub const FALLBACK_BASE_PRICE: f64 = 150.0;

/// Client name -> (service type or `"default"`) -> unit price.
///
/// Loaded once per session from the operator's settings document and saved
/// wholesale on edit; a `BTreeMap` keeps clients in display order.
pub type PriceTable = BTreeMap<String, BTreeMap<String, f64>>;

/// Standard per-type prices applied to a newly added client.
pub fn standard_defaults() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("ROUBO/FURTO".into(), 150.0),
        ("RECUPERAÇÃO".into(), 150.0),
        ("VERIFICAÇÃO".into(), 150.0),
        ("ALARME".into(), 50.0),
        ("ANTENA".into(), 100.0),
        ("APOIO".into(), 150.0),
        (DEFAULT_KEY.into(), 150.0),
    ])
}

/// Built-in table used when the operator has no saved settings yet.
pub fn default_table() -> PriceTable {
    let mut table = PriceTable::new();
    let mut on_system = standard_defaults();
    on_system.insert(DEFAULT_KEY.into(), 200.0);
    table.insert("OnSystem".into(), on_system);
    for client in ["RVS", "C&C", "Sancor", "Carsystem"] {
        table.insert(client.into(), standard_defaults());
    }
    table
}

/// Resolve the base price for a client and service type.
///
/// Resolution never fails: a missing or zero entry falls through to the
/// client's `"default"` entry, then to legacy name-fragment heuristics for
/// clients that predate configurable pricing, then to
/// [`FALLBACK_BASE_PRICE`]. Billing must not be blocked by an incomplete
/// table.
pub fn resolve_price(table: &PriceTable, client: &str, service_type: &str) -> f64 {
    let service_type = service_type.to_uppercase();

    let mut base = 0.0;
    if let Some(entry) = table.get(client) {
        if let Some(&p) = entry.get(&service_type) {
            base = p;
        }
        if base == 0.0
            && let Some(&p) = entry.get(DEFAULT_KEY)
        {
            base = p;
        }
    }

    // Legacy compatibility path for clients that were never configured.
    if base == 0.0 {
        if client.contains("OnSystem") {
            base = 200.0;
        } else if client.contains("RVS") {
            if service_type.contains("ROUBO") || service_type.contains("FURTO") {
                base = 200.0;
            } else if service_type.contains("VERIFICA") {
                base = 100.0;
            }
        } else if client.contains("C&C") {
            base = 200.0;
        }
        if base == 0.0 {
            base = FALLBACK_BASE_PRICE;
        }
    }

    base
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(client: &str, entries: &[(&str, f64)]) -> PriceTable {
        let mut table = PriceTable::new();
        table.insert(
            client.into(),
            entries.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
        );
        table
    }

    #[test]
    fn exact_entry_wins() {
        let table = table_with("Sancor", &[("ALARME", 75.0), (DEFAULT_KEY, 150.0)]);
        assert_eq!(resolve_price(&table, "Sancor", "ALARME"), 75.0);
    }

    #[test]
    fn service_type_lookup_is_case_insensitive() {
        let table = table_with("Sancor", &[("ALARME", 75.0)]);
        assert_eq!(resolve_price(&table, "Sancor", "alarme"), 75.0);
    }

    #[test]
    fn missing_type_falls_back_to_client_default() {
        let table = table_with("Sancor", &[(DEFAULT_KEY, 180.0)]);
        assert_eq!(resolve_price(&table, "Sancor", "ANTENA"), 180.0);
    }

    #[test]
    fn zero_entry_falls_through_to_default() {
        let table = table_with("Sancor", &[("ANTENA", 0.0), (DEFAULT_KEY, 180.0)]);
        assert_eq!(resolve_price(&table, "Sancor", "ANTENA"), 180.0);
    }

    #[test]
    fn unconfigured_rvs_uses_legacy_heuristics() {
        // No table configured at all.
        let table = PriceTable::new();
        assert_eq!(resolve_price(&table, "RVS", "ROUBO/FURTO"), 200.0);
        assert_eq!(resolve_price(&table, "RVS", "VERIFICAÇÃO"), 100.0);
        assert_eq!(resolve_price(&table, "OnSystem", "APOIO"), 200.0);
        assert_eq!(resolve_price(&table, "C&C", "ANTENA"), 200.0);
    }

    #[test]
    fn configured_table_shadows_heuristics() {
        // A saved price must win over the legacy name-fragment path.
        let table = table_with("RVS", &[("ROUBO/FURTO", 170.0)]);
        assert_eq!(resolve_price(&table, "RVS", "ROUBO/FURTO"), 170.0);
    }

    #[test]
    fn unknown_client_gets_global_base() {
        let table = PriceTable::new();
        assert_eq!(
            resolve_price(&table, "Transportadora X", "APOIO"),
            FALLBACK_BASE_PRICE
        );
    }

    #[test]
    fn default_table_seeds_known_clients() {
        let table = default_table();
        assert_eq!(resolve_price(&table, "OnSystem", "APOIO"), 150.0);
        // OnSystem's catch-all is raised to 200 for unlisted types.
        assert_eq!(table["OnSystem"][DEFAULT_KEY], 200.0);
        assert_eq!(resolve_price(&table, "Carsystem", "ALARME"), 50.0);
    }
}
