use std::collections::HashMap;

use agrinova_shared::{inventory::InventoryItem, reports::FarmReport, users::Profile};

use super::table::{ColSpec, Table, terminal_width};
use super::{bold, dim};
use crate::farm::inventory::UNKNOWN_UPLOADER;
use crate::util::format::{format_date, format_date_time, or_dash};

pub fn print_inventory(items: &[InventoryItem], uploaders: &HashMap<String, String>) {
    if items.is_empty() {
        println!("{}", dim("No inventory items yet"));
        return;
    }

    let t = Table::new(
        terminal_width().saturating_sub(2),
        2,
        vec![
            ColSpec::left("ITEM", 16, Some(36), 3),
            ColSpec::right("QTY", 8),
            ColSpec::left("UNIT", 7, Some(7), 0),
            ColSpec::left("ADDED BY", 12, Some(24), 1),
            ColSpec::left("ADDED", 10, Some(10), 0),
            ColSpec::left("PHOTO", 5, Some(5), 0),
        ],
    );

    let mut out = String::new();
    out.push_str("  ");
    t.header(&mut out);
    for item in items {
        let quantity = item.quantity.to_string();
        let by = uploaders
            .get(&item.created_by)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_UPLOADER);
        let added = format_date(&item.created_at);
        let photo = if item.image_url.is_some() { "yes" } else { "-" };
        out.push_str("  ");
        t.row(&mut out, &[&item.name, &quantity, &item.unit, by, &added, photo]);
    }
    print!("{out}");
}

pub fn print_reports(reports: &[FarmReport]) {
    if reports.is_empty() {
        println!("{}", dim("No reports filed yet"));
        return;
    }

    for (i, r) in reports.iter().enumerate() {
        if i > 0 {
            println!();
        }
        println!(
            "{}  {}",
            bold(&r.section),
            dim(&format!("{} by {}", format_date_time(&r.created_at), r.prepared_by))
        );
        let rows: [(&str, Option<&str>); 10] = [
            ("Activities", Some(r.activities.as_str())),
            ("Production", Some(r.production_count.as_str())),
            ("Casualties", Some(r.casualties.as_str())),
            ("Observations", Some(r.observations.as_str())),
            ("Weather", Some(r.weather.as_str())),
            ("Challenges", r.challenges.as_deref()),
            ("Plans", r.plans.as_deref()),
            ("Inputs used", r.inputs_used.as_deref()),
            ("Revenue", r.sales_revenue.as_deref()),
            ("Expenses", r.expenses_incurred.as_deref()),
        ];
        for (label, value) in rows {
            if let Some(value) = value {
                println!("  {:<13} {}", format!("{label}:"), or_dash(Some(value)));
            }
        }
    }
}

pub fn print_workers(workers: &[Profile]) {
    if workers.is_empty() {
        println!("{}", dim("No workers have joined yet"));
        return;
    }

    let t = Table::new(
        terminal_width().saturating_sub(2),
        2,
        vec![
            ColSpec::left("NAME", 16, Some(32), 2),
            ColSpec::left("EMAIL", 20, Some(40), 2),
            ColSpec::left("PHONE", 12, Some(16), 0),
            ColSpec::left("JOINED", 10, Some(10), 0),
        ],
    );

    let mut out = String::new();
    out.push_str("  ");
    t.header(&mut out);
    for w in workers {
        let joined = w
            .created_at
            .as_ref()
            .map(format_date)
            .unwrap_or_else(|| "-".into());
        out.push_str("  ");
        t.row(
            &mut out,
            &[&w.full_name, &w.email, or_dash(w.phone.as_deref()), &joined],
        );
    }
    print!("{out}");
}
