use agrinova_shared::{session::Session, weather::WeatherReport};

use super::{bold, dim, role_badge};
use crate::util::format::or_dash;

pub fn print_session(session: &Session) {
    println!("{}", bold(&session.full_name));
    println!("  {:<14} {}", "Email:", session.email);
    println!("  {:<14} {}", "Role:", role_badge(session.role));
    println!(
        "  {:<14} {} {}",
        "Organization:",
        or_dash(session.organization_name.as_deref()),
        dim(&format!("({})", session.organization_id))
    );
    println!("  {:<14} {}", "Phone:", or_dash(session.phone.as_deref()));
    if session.role.is_manager() {
        println!(
            "  {:<14} {}",
            "Join code:",
            or_dash(session.join_code.as_deref())
        );
    }
}

pub fn print_weather(report: &WeatherReport) {
    let loc = &report.location;
    println!(
        "{} {}",
        bold(&loc.name),
        dim(&format!("{}, {} · {}", loc.region, loc.country, loc.localtime))
    );
    let c = &report.current;
    println!("  {:<12} {}", "Conditions:", c.condition.text);
    println!("  {:<12} {:.1}°C (feels {:.1}°C)", "Temp:", c.temp_c, c.feelslike_c);
    println!("  {:<12} {:.0}%", "Humidity:", c.humidity);
    println!("  {:<12} {:.1} km/h {}", "Wind:", c.wind_kph, c.wind_dir);
    println!("  {:<12} {:.1} mm", "Rain:", c.precip_mm);
    println!("  {:<12} {:.1}", "UV:", c.uv);
    println!("  {}", dim(&format!("updated {}", c.last_updated)));
}
