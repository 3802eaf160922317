use anyhow::Result;
use colored::Colorize;
use omrs_core::{ExpandedOrder, OrderRecord};
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::OutputFormat;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_orders(orders: &[OrderRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(orders),
        OutputFormat::Table => {
            print_table(orders.is_empty(), || orders_table(orders));
            Ok(())
        }
    }
}

pub fn print_expanded(orders: &[ExpandedOrder], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(orders),
        OutputFormat::Table => {
            print_table(orders.is_empty(), || expanded_table(orders));
            Ok(())
        }
    }
}

pub fn print_drug_orders(orders: &[OrderRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(orders),
        OutputFormat::Table => {
            print_table(orders.is_empty(), || drug_table(orders));
            Ok(())
        }
    }
}

fn print_table(empty: bool, render: impl FnOnce() -> String) {
    if empty {
        println!("No orders found.");
    } else {
        println!("{}", render());
    }
}

fn or_dash(value: Option<&str>) -> &str {
    value.filter(|v| !v.is_empty()).unwrap_or("-")
}

fn concept_name(order: &OrderRecord) -> &str {
    or_dash(order.concept_info.as_ref().and_then(|c| c.name.as_deref()))
}

fn order_row(order: &OrderRecord) -> [String; 7] {
    [
        order.order_id.to_string(),
        or_dash(order.order_number.as_deref()).to_string(),
        concept_name(order).to_string(),
        or_dash(order.patient_info.as_ref().and_then(|p| p.name.as_deref())).to_string(),
        or_dash(
            order
                .orderer_info
                .as_ref()
                .and_then(|o| o.person.name.as_deref()),
        )
        .to_string(),
        or_dash(order.urgency.as_deref()).to_string(),
        order
            .date_activated
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string()),
    ]
}

const ORDER_HEADER: [&str; 7] = [
    "ID",
    "Number",
    "Concept",
    "Patient",
    "Orderer",
    "Urgency",
    "Activated",
];

pub fn orders_table(orders: &[OrderRecord]) -> String {
    let mut builder = Builder::default();
    builder.push_record(ORDER_HEADER);
    for order in orders {
        builder.push_record(order_row(order));
    }
    builder.build().with(Style::rounded()).to_string()
}

pub fn expanded_table(orders: &[ExpandedOrder]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Concept", "Set members", "Parent panel", "Answers"]);
    for expanded in orders {
        let order = &expanded.order;
        let members = expanded
            .set_members
            .as_ref()
            .map(|members| {
                members
                    .iter()
                    .map(|m| m.order_id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_else(|| "-".to_string());
        let parent = expanded
            .parent_concept
            .as_ref()
            .map(|p| format!("{} ({})", or_dash(p.name.as_deref()), p.concept_id))
            .unwrap_or_else(|| "-".to_string());
        let answers = order
            .concept_info
            .as_ref()
            .and_then(|c| c.answers.as_ref())
            .map(|answers| {
                answers
                    .iter()
                    .map(|a| or_dash(a.name.as_deref()).to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_else(|| "-".to_string());

        builder.push_record([
            order.order_id.to_string(),
            concept_name(order).to_string(),
            members,
            parent,
            answers,
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}

fn with_unit(amount: Option<String>, unit: Option<&str>) -> String {
    match (amount, unit) {
        (Some(amount), Some(unit)) => format!("{amount} {unit}"),
        (Some(amount), None) => amount,
        (None, _) => "-".to_string(),
    }
}

pub fn drug_table(orders: &[OrderRecord]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["ID", "Drug", "Dose", "Frequency", "Route", "Duration", "Quantity"]);
    for order in orders {
        let Some(drug) = order.drug_order_info.as_ref() else {
            builder.push_record([
                order.order_id.to_string(),
                concept_name(order).to_string(),
                "-".into(),
                "-".into(),
                "-".into(),
                "-".into(),
                "-".into(),
            ]);
            continue;
        };
        builder.push_record([
            order.order_id.to_string(),
            or_dash(drug.drug_name.as_deref().or(drug.drug_non_coded.as_deref())).to_string(),
            with_unit(drug.dose.map(|d| d.to_string()), drug.dose_units_name.as_deref()),
            or_dash(drug.frequency_name.as_deref()).to_string(),
            or_dash(drug.route_name.as_deref()).to_string(),
            with_unit(
                drug.duration.map(|d| d.to_string()),
                drug.duration_units_name.as_deref(),
            ),
            with_unit(
                drug.quantity.map(|q| q.to_string()),
                drug.quantity_units_name.as_deref(),
            ),
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}
