//! Built-in rule tables for the Pune PMPML deployment.
//!
//! These are the values used when no `[rules]` section overrides them. They
//! describe the data, not the engine: replace them with your own city's
//! tables in `vizlint.toml` rather than editing rule code.

use crate::models::conventions::{
    AggregateCheck, Citation, DataConfig, EntityTable, ExpectMode, GapInterval, KnownIssue,
    LocationTable, RangeCheck, ReferenceFile, ReferenceMarker, RowCount, RuleConfig, SeriesOrder,
    TableRole, UnreliableColumn, ValueExpectation,
};
use crate::models::Severity;

pub const UTILIZATION_COLUMN: &str = "% of Fleet Utilization(PMPML+PPP)";
const SANCTIONED_COLUMN: &str = "No.of Schedules Sanctioned Per Day (PMPML + PPP)";
const OPERATED_COLUMN: &str = "Average No.of Schedule operated Per Day (PMPML+PPP)";
const EARNING_COLUMN: &str = "All Traffic Earning (₹)";

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn gap(source: &str, start: &str, end: &str, note: &str) -> GapInterval {
    GapInterval {
        source: source.into(),
        start: start.into(),
        end: end.into(),
        note: note.into(),
    }
}

fn known(file: &str, date: &str, entity: &str, column: &str, note: &str) -> KnownIssue {
    KnownIssue {
        file: file.into(),
        date: date.into(),
        entity: entity.into(),
        column: column.into(),
        note: note.into(),
    }
}

fn default_gaps() -> Vec<GapInterval> {
    const Q4: &str = "Reports not retrieved for Q4 FY2023-24";
    const PARTIAL: &str = "Reports not retrieved for partial FY2024-25";
    const BATCH: &str = "Reports not retrieved; PMPML publishes quarterly batches";
    vec![
        gap("extracted", "Jan 2024", "Mar 2024", Q4),
        gap("extracted", "Nov 2024", "Mar 2025", PARTIAL),
        gap("extracted", "Jul 2025", "Sep 2025", BATCH),
        gap("brt_extracted", "Jan 2023", "Jan 2023", "BRT Jan 2023 report not retrieved"),
        gap("brt_extracted", "Jan 2024", "Mar 2024", Q4),
        gap("brt_extracted", "Nov 2024", "Mar 2025", PARTIAL),
        gap("brt_extracted", "Jul 2025", "Sep 2025", BATCH),
        gap("ebus_extracted", "Jan 2024", "Mar 2024", Q4),
        gap("ebus_extracted", "Nov 2024", "Mar 2025", PARTIAL),
        gap("ebus_extracted", "Jul 2025", "Sep 2025", BATCH),
    ]
}

fn default_known_issues() -> Vec<KnownIssue> {
    vec![
        known(
            "extracted.csv",
            "Dec 2023",
            "Pune Station",
            UTILIZATION_COLUMN,
            "Source report shows 200%: formula quirk when hired fleet exceeds own schedule count. Capped with LEAST(..., 100.0).",
        ),
        known(
            "extracted.csv",
            "Dec 2023",
            "Nigadi",
            UTILIZATION_COLUMN,
            "Source report shows 116.67%, same quirk as Pune Station. Capped in SQL.",
        ),
        known(
            "extracted.csv",
            "Feb 2023",
            "*",
            EARNING_COLUMN,
            "Column shift in the original extraction; imputed as ticket + pass + student earnings.",
        ),
        known(
            "extracted.csv",
            "Apr 2023",
            "*",
            "Earning per KMs in Rs.(EPK) (₹)",
            "All-traffic EPK printed in the ticket-only column; imputed from ticket earning / effective km.",
        ),
        known(
            "extracted.csv",
            "*",
            "*",
            "Total Gross KMs (Diesel+CNG+E)",
            "Records only own diesel gross km for many depots from Feb 2023; not used in any chart.",
        ),
        known(
            "ebus_extracted.csv",
            "Dec 2023",
            "Hadapsar",
            "passengers_per_day",
            "Monthly total entered as a daily average; imputed from earnings and earlier per-passenger yield.",
        ),
        known(
            "extracted.csv",
            "Jan 2023",
            "*",
            SANCTIONED_COLUMN,
            "Sanctioned and Operated swapped for 8 depots; queries rebuild them with GREATEST/LEAST.",
        ),
        known(
            "extracted.csv",
            "Mar 2023",
            "*",
            SANCTIONED_COLUMN,
            "Same Sanctioned/Operated swap as Jan 2023; queries rebuild them with GREATEST/LEAST.",
        ),
        known(
            "extracted.csv",
            "Oct 2023",
            "Nigadi",
            "Gross KMs- Diesel (Own)",
            "104,315 km for 9 own buses; hire fleet km likely entered in the own-bus column.",
        ),
        known(
            "extracted.csv",
            "Nov 2023",
            "Nigadi",
            "Gross KMs- Diesel (Own)",
            "81,248 km for 5 own buses; same entry error as Oct 2023.",
        ),
    ]
}

fn default_markers() -> Vec<ReferenceMarker> {
    vec![
        ReferenceMarker {
            rule: "REFERENCELINE_EBUS_FLEET".into(),
            x: "2023-10-01".into(),
            page_name_contains: Some("ebus".into()),
            chart_columns: strings(&["avg_on_road", "avg_off_road", "fleet_utilization_pct"]),
            content_pattern: None,
            message: "EBus fleet chart is missing fleet expansion markers. The e-bus fleet stepped up Oct 2023 (458→473), Aug 2024 (473→490), and changed Apr 2025. Add: <ReferenceLine x='2023-10-01' label=\"Fleet: 458→473\" hideValue=true color=base-content-muted/> (and similarly for 2024-08-01 and 2025-04-01).".into(),
        },
        ReferenceMarker {
            rule: "REFERENCELINE_DIESEL_EST".into(),
            x: "2024-04-01".into(),
            page_name_contains: None,
            chart_columns: Vec::new(),
            content_pattern: Some(r"(?is)COALESCE\s*\(\s*NULLIF.*?Total Eff;km\.Diesel".into()),
            message: "Page uses diesel km back-calculation (COALESCE/NULLIF on 'Total Eff;km.Diesel') but has no estimation-boundary marker. From April 2024, diesel km values are estimated from KMPL × consumption. Add: <ReferenceLine x='2024-04-01' label=\"Diesel km estimated\" hideValue=true color=base-content-muted lineType=dashed/>".into(),
        },
    ]
}

impl Default for DataConfig {
    fn default() -> Self {
        default_data()
    }
}

fn default_data() -> DataConfig {
    let monthly = |file: &str, label: &str, role: TableRole| EntityTable {
        file: file.into(),
        label: label.into(),
        entity_column: "Depot".into(),
        period_column: Some("Date".into()),
        exclude: strings(&["System Total"]),
        role,
        required: false,
    };
    DataConfig {
        entity_tables: vec![
            monthly("extracted.csv", "extracted", TableRole::Primary),
            monthly("brt_extracted.csv", "brt_extracted", TableRole::Secondary),
            monthly("ebus_extracted.csv", "ebus_extracted", TableRole::Other),
        ],
        locations: Some(LocationTable {
            file: "depot_locations.csv".into(),
            entity_column: "depot".into(),
            coordinate_columns: strings(&["latitude", "longitude"]),
            required: false,
        }),
        // M.Yard served as a BRT base in 2023 and reappears as Upper Depot.
        allowlisted_entities: ["M.Yard".to_string()].into_iter().collect(),
        ranges: vec![RangeCheck {
            rule: "DATA_UTIL_OUTLIER".into(),
            file: "extracted.csv".into(),
            column: UTILIZATION_COLUMN.into(),
            label: "fleet utilization".into(),
            unit: "%".into(),
            max: 110.0,
            severity: Severity::Warn,
        }],
        aggregates: vec![AggregateCheck {
            rule: "DATA_EARNINGS".into(),
            file: "extracted.csv".into(),
            period: "Feb 2023".into(),
            column: EARNING_COLUMN.into(),
            min_total: 100_000_000.0,
            expected: "~₹450M".into(),
            severity: Severity::Error,
        }],
        references: vec![
            ReferenceFile {
                rule: "DATA_PNL".into(),
                file: "PMPML_Financial_PnL.csv".into(),
                required: true,
                hint: Some("run /tmp/build_pnl_csv.py to regenerate".into()),
                required_columns: strings(&[
                    "fiscal_year",
                    "revenue_bus_ops",
                    "employee_benefits",
                    "total_expenses",
                    "operating_profit_loss",
                    "total_reimbursements",
                    "net_profit_loss",
                ]),
                expect: vec![ValueExpectation {
                    column: "fiscal_year".into(),
                    values: strings(&[
                        "2017-18", "2018-19", "2019-20", "2020-21", "2021-22", "2022-23",
                        "2023-24", "2024-25",
                    ]),
                    mode: ExpectMode::All,
                    severity: Severity::Warn,
                    message: None,
                }],
                rows: Some(RowCount {
                    expected: 8,
                    exact: false,
                    note: Some("one per fiscal year 2017-18 to 2024-25".into()),
                }),
            },
            ReferenceFile {
                rule: "DATA_PVR".into(),
                file: "pune_vehicle_registrations.csv".into(),
                required: true,
                hint: Some(
                    "source: Maharashtra vehicle registrations export (maharashtravehicle registrations.csv)"
                        .into(),
                ),
                required_columns: strings(&["year", "city", "motor_cycles", "cars", "auto_rickshaws"]),
                expect: vec![
                    ValueExpectation {
                        column: "city".into(),
                        values: strings(&["Pune", "Pimpri-Chinchwad"]),
                        mode: ExpectMode::Each,
                        severity: Severity::Error,
                        message: None,
                    },
                    ValueExpectation {
                        column: "year".into(),
                        values: strings(&["2000-2001", "2017-2018"]),
                        mode: ExpectMode::All,
                        severity: Severity::Warn,
                        message: Some(
                            "pune_vehicle_registrations.csv should cover 2000-2001 to 2017-2018"
                                .into(),
                        ),
                    },
                ],
                rows: None,
            },
            ReferenceFile {
                rule: "DATA_BS".into(),
                file: "PMPML_Balance_Sheet.csv".into(),
                required: true,
                hint: None,
                required_columns: strings(&[
                    "fy2017_18_lakhs",
                    "fy2018_19_lakhs",
                    "fy2019_20_lakhs",
                    "fy2020_21_lakhs",
                    "fy2021_22_lakhs",
                    "fy2022_23_lakhs",
                    "fy2023_24_lakhs",
                    "fy2024_25_lakhs",
                ]),
                expect: vec![ValueExpectation {
                    column: "item".into(),
                    values: strings(&[
                        "Property Plant & Equipment (Net)",
                        "Other Non-Current Assets",
                        "Inventories",
                        "Trade Receivables",
                        "Cash & Cash Equivalents",
                        "Loans & Advances",
                        "Other Current Assets",
                        "Short-Term Borrowings",
                        "Other Non-Current Liabilities",
                    ]),
                    mode: ExpectMode::All,
                    severity: Severity::Error,
                    message: None,
                }],
                rows: Some(RowCount {
                    expected: 9,
                    exact: true,
                    note: None,
                }),
            },
        ],
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        RuleConfig {
            primary_tables: strings(&["extracted", "brt_extracted", "ebus_extracted"]),
            null_guard: "Date IS NOT NULL".into(),
            date_axis: "date_parsed".into(),
            deprecated_names: [
                ("Bhekrainagar", "Bhekrai Nagar"),
                ("P.Station", "Pune Station"),
                ("Shewal-wadi", "Shewalwadi"),
                ("Shewal- wadi", "Shewalwadi"),
                ("Bhekrai\nNagar", "Bhekrai Nagar"),
                ("Pune\nStation", "Pune Station"),
                ("Uppar Depot", "Upper Depot"),
            ]
            .into_iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect(),
            known_issues: default_known_issues(),
            gaps: default_gaps(),
            capped_columns: strings(&[UTILIZATION_COLUMN]),
            swapped_columns: strings(&[SANCTIONED_COLUMN, OPERATED_COLUMN]),
            unreliable_columns: vec![UnreliableColumn {
                column: "Total Gross KMs (Diesel+CNG+E)".into(),
                replacement: "Total Dead KMs (Diesel+CNG+E)".into(),
                reason: "it omits hire fleet and has wrong values in Jan 2023".into(),
            }],
            integer_year_columns: strings(&["Year", "census_year", "year_num"]),
            format_keywords: strings(&[
                "revenue",
                "earning",
                "crore",
                "deficit",
                "profit",
                "loss",
                "reimburse",
                "income",
                "expense",
                "cost",
                "utiliz",
                "pct",
                "rate",
                "ratio",
                "passengers",
                "ridership",
                "km",
                "fare",
                "cumulative",
                "total_revenue",
                "avg_fleet",
            ]),
            zero_cross_keywords: strings(&[
                "pl_cr",
                "net_pl",
                "operating_pl",
                "profit_loss",
                "deficit",
                "surplus",
                "net_position",
                "net_profit",
            ]),
            markers: default_markers(),
            citations: vec![Citation {
                trigger: "PMPML_Financial_PnL".into(),
                url: "pmpml.org/financial_performance".into(),
            }],
            series_orders: vec![SeriesOrder {
                series_column: "fuel_type".into(),
                categories: strings(&["cng", "diesel", "ebus"]),
            }],
            data: DataConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gaps::derive_gaps;

    #[test]
    fn test_builtin_gaps_have_three_universal_ranges() {
        let cfg = RuleConfig::default();
        let table = derive_gaps(&cfg.gaps);
        assert_eq!(table.universal.len(), 3);
        // BRT Jan 2023 is declared by a single source only
        assert_eq!(table.source_only.len(), 1);
        assert_eq!(table.source_only[0].label, "Jan 2023");
    }

    #[test]
    fn test_builtin_deprecated_names_include_newline_variants() {
        let cfg = RuleConfig::default();
        assert_eq!(
            cfg.deprecated_names.get("Pune\nStation").map(String::as_str),
            Some("Pune Station")
        );
    }
}
