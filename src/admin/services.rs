use crate::delegates::repo::{Delegate, MunExperience};

pub const CSV_HEADER: &str = "id,firstname,lastname,email,contact,dateofbirth,gender,pastmuns";

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn render_pastmuns(muns: &[MunExperience]) -> String {
    muns.iter()
        .map(|m| {
            format!(
                "{} | {} | {} | {} | {}",
                m.name, m.committee, m.delegation, m.year, m.award
            )
        })
        .collect::<Vec<_>>()
        .join(" ; ")
}

/// Render the export document: fixed column order, one data row per
/// delegate, experiences pipe-delimited and joined by " ; ".
pub fn render_csv(delegates: &[Delegate]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for d in delegates {
        let row = [
            csv_field(&d.id),
            csv_field(&d.firstname),
            csv_field(&d.lastname),
            csv_field(&d.email),
            csv_field(&d.contact),
            csv_field(&d.dateofbirth),
            csv_field(&d.gender),
            csv_field(&render_pastmuns(&d.pastmuns)),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}
