//! Marketing landing page. Static content only.

use std::fmt::Write;

pub const BRAND: &str = "WebCraft AI";

#[derive(Debug, Clone, Copy)]
pub struct NavLink {
    pub key: &'static str,
    pub label: &'static str,
    pub href: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Card {
    pub title: &'static str,
    pub desc: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct Plan {
    pub name: &'static str,
    pub price: &'static str,
    pub desc: &'static str,
    pub features: &'static [&'static str],
    pub popular: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Stat {
    pub number: &'static str,
    pub label: &'static str,
}

pub const NAV_LINKS: &[NavLink] = &[
    NavLink { key: "home", label: "Home", href: "#home" },
    NavLink { key: "features", label: "Features", href: "#features" },
    NavLink { key: "demo", label: "Demo", href: "#demo" },
    NavLink { key: "pricing", label: "Pricing", href: "#pricing" },
    NavLink { key: "about", label: "About", href: "#about" },
];

pub const FEATURES: &[Card] = &[
    Card { title: "Instant Generation", desc: "Create full websites in seconds with AI" },
    Card { title: "Responsive Design", desc: "Perfect on all devices automatically" },
    Card { title: "Clean Code", desc: "Production-ready HTML and CSS" },
];

pub const DEMO_STEPS: &[Card] = &[
    Card { title: "Describe Your Vision", desc: "Tell us what kind of website you want to create" },
    Card { title: "AI Generates Code", desc: "Watch as your website is built in real-time" },
    Card { title: "Customize & Export", desc: "Make final tweaks and download your code" },
];

pub const PLANS: &[Plan] = &[
    Plan {
        name: "Starter",
        price: "Free",
        desc: "Perfect for trying out",
        features: &["5 websites per month", "Basic templates", "Standard support", "Export HTML/CSS"],
        popular: false,
    },
    Plan {
        name: "Pro",
        price: "$19",
        desc: "For serious creators",
        features: &["Unlimited websites", "Premium templates", "Priority support", "Advanced customization", "Commercial license"],
        popular: true,
    },
    Plan {
        name: "Team",
        price: "$49",
        desc: "For teams & agencies",
        features: &["Everything in Pro", "Team collaboration", "White-label exports", "API access", "Dedicated support"],
        popular: false,
    },
];

pub const STATS: &[Stat] = &[
    Stat { number: "50K+", label: "Websites Created" },
    Stat { number: "99.9%", label: "Uptime" },
    Stat { number: "2.3s", label: "Avg Generation Time" },
    Stat { number: "24/7", label: "Support" },
];

const STYLE: &str = "
* { box-sizing: border-box; }
html { scroll-behavior: smooth; }
body { margin: 0; background: #0f172a; color: #cbd5e1; font-family: system-ui, sans-serif; }
nav { position: fixed; top: 0; left: 0; right: 0; display: flex; justify-content: space-between; align-items: center; padding: 1rem 2rem; background: rgba(15, 23, 42, 0.8); backdrop-filter: blur(12px); }
nav a { color: #cbd5e1; margin-left: 1.5rem; text-decoration: none; }
nav a:hover { color: #fff; }
.brand { color: #fff; font-weight: 700; font-size: 1.25rem; }
section { max-width: 72rem; margin: 0 auto; padding: 8rem 1.5rem 4rem; }
h1, h2, h3 { color: #fff; }
.grid { display: grid; grid-template-columns: repeat(auto-fit, minmax(16rem, 1fr)); gap: 2rem; }
.card { padding: 2rem; border: 1px solid #334155; border-radius: 1rem; background: rgba(30, 41, 59, 0.5); }
.popular { border-color: #06b6d4; }
.accent { background: linear-gradient(90deg, #22d3ee, #a855f7); -webkit-background-clip: text; color: transparent; }
footer { border-top: 1px solid #1e293b; padding: 3rem 2rem; text-align: center; }
";

/// Render the full landing page.
pub fn render_landing() -> String {
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    let _ = writeln!(out, "<title>{BRAND}</title>\n<style>{STYLE}</style>\n</head>\n<body>");

    let _ = write!(out, "<nav><span class=\"brand\">{BRAND}</span><div>");
    for link in NAV_LINKS {
        let _ = write!(out, "<a id=\"nav-{}\" href=\"{}\">{}</a>", link.key, link.href, link.label);
    }
    out.push_str("</div></nav>\n");

    out.push_str(
        "<section id=\"home\"><h1>Build Websites <span class=\"accent\">In Real Time</span></h1>\
         <p>Transform your ideas into stunning websites instantly with AI-powered generation. \
         No coding required, just describe your vision.</p></section>\n",
    );

    section(&mut out, "features", "Powerful", "Features", "Everything you need to create professional websites without any technical knowledge");
    cards(&mut out, FEATURES, false);
    out.push_str("</section>\n");

    section(&mut out, "demo", "See It In", "Action", "Watch how easy it is to create professional websites with just a few words");
    cards(&mut out, DEMO_STEPS, true);
    out.push_str("</section>\n");

    section(&mut out, "pricing", "Simple", "Pricing", "Choose the perfect plan for your needs. Start free, upgrade anytime.");
    out.push_str("<div class=\"grid\">");
    for plan in PLANS {
        let class = if plan.popular { "card popular" } else { "card" };
        let per = if plan.price == "Free" { "" } else { "/month" };
        let _ = write!(out, "<div class=\"{class}\"><h3>{}</h3><p><strong>{}</strong>{per}</p><p>{}</p><ul>", plan.name, plan.price, plan.desc);
        for feature in plan.features {
            let _ = write!(out, "<li>{feature}</li>");
        }
        out.push_str("</ul></div>");
    }
    out.push_str("</div></section>\n");

    section(&mut out, "about", "About", BRAND, "We're on a mission to democratize web development and make beautiful websites accessible to everyone.");
    out.push_str("<div class=\"grid\">");
    for stat in STATS {
        let _ = write!(out, "<div class=\"card\"><h3>{}</h3><p>{}</p></div>", stat.number, stat.label);
    }
    out.push_str("</div></section>\n");

    let _ = writeln!(out, "<footer><span class=\"brand\">{BRAND}</span><p>&copy; 2024 {BRAND}. All rights reserved.</p></footer>\n</body>\n</html>");
    out
}

fn section(out: &mut String, id: &str, lead: &str, accent: &str, blurb: &str) {
    let _ = write!(out, "<section id=\"{id}\"><h2>{lead} <span class=\"accent\">{accent}</span></h2><p>{blurb}</p>");
}

fn cards(out: &mut String, items: &[Card], numbered: bool) {
    out.push_str("<div class=\"grid\">");
    for (i, card) in items.iter().enumerate() {
        let step = if numbered { format!("<span>{:02}</span>", i + 1) } else { String::new() };
        let _ = write!(out, "<div class=\"card\">{step}<h3>{}</h3><p>{}</p></div>", card.title, card.desc);
    }
    out.push_str("</div>");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_nav_link_has_a_section() {
        let page = render_landing();
        for link in NAV_LINKS {
            let anchor = link.href.trim_start_matches('#');
            assert!(page.contains(&format!("<section id=\"{anchor}\"")), "missing section for {}", link.key);
        }
    }

    #[test]
    fn only_one_plan_is_popular() {
        assert_eq!(PLANS.iter().filter(|p| p.popular).count(), 1);
        let page = render_landing();
        assert_eq!(page.matches("card popular").count(), 1);
        assert!(page.contains("<strong>$19</strong>/month"));
        assert!(page.contains("<strong>Free</strong></p>"));
    }
}
