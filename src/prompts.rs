use crate::extract::Artifact;
use serde::{Deserialize, Serialize};

const CREATE_SYSTEM: &str = "You are an expert web developer specializing in creating modern, responsive websites. Always generate complete, functional code that works immediately when saved as files.

IMPORTANT REQUIREMENTS:
- Generate complete, production-ready HTML and CSS
- Use modern web standards and best practices
- Make designs responsive and mobile-friendly
- Include semantic HTML structure
- Use CSS Grid/Flexbox for layouts
- Add hover effects and smooth transitions
- Ensure good contrast and accessibility
- Include meta tags for viewport and SEO
- Use modern color schemes and typography
- Make interactive elements functional with CSS only when possible

FORMAT: Always return exactly two code blocks:
1. Complete HTML (including DOCTYPE, head, meta tags, etc.)
2. Complete CSS (all styles needed)";

const MODIFY_SYSTEM: &str = "You are an expert web developer making modifications to existing websites. Maintain the overall design consistency while implementing the requested changes.

MODIFICATION GUIDELINES:
- Preserve existing functionality unless specifically asked to change it
- Maintain responsive design principles
- Keep the visual style consistent with existing design
- Only modify what's specifically requested
- Ensure all changes work properly across devices
- Maintain accessibility standards
- Update related styles if needed for consistency

FORMAT: Always return exactly two complete code blocks with the fully updated code.";

const SPECIALIZED_REQUIREMENTS: &str = "TECHNICAL REQUIREMENTS:
- Mobile-first responsive design
- Fast loading and optimized code
- SEO-friendly structure
- Accessibility compliance (WCAG guidelines)
- Modern CSS features (Grid, Flexbox, custom properties)
- Smooth animations and micro-interactions
- Cross-browser compatibility

DESIGN REQUIREMENTS:
- Contemporary, professional appearance
- Clear visual hierarchy and information architecture
- Consistent branding and color scheme
- Effective use of whitespace
- Engaging but not overwhelming visuals";

const FORMAT_REMINDER: &str =
    "Return the HTML and CSS separately, enclosed in code blocks (```html ... ``` and ```css ... ```).";

/// Kind of site for specialized generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SiteKind {
    Landing,
    Portfolio,
    Business,
    Blog,
    Ecommerce,
    Dashboard,
}

impl SiteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Landing => "landing",
            Self::Portfolio => "portfolio",
            Self::Business => "business",
            Self::Blog => "blog",
            Self::Ecommerce => "ecommerce",
            Self::Dashboard => "dashboard",
        }
    }

    fn brief(self) -> &'static str {
        match self {
            Self::Landing => "Create a high-converting landing page with hero section, features, testimonials, and CTA buttons. Focus on conversion optimization and visual appeal.",
            Self::Portfolio => "Create a professional portfolio website with project showcases, about section, and contact information. Emphasize visual presentation and user experience.",
            Self::Business => "Create a professional business website with services, about, and contact sections. Focus on credibility and clear value proposition.",
            Self::Blog => "Create a modern blog layout with article listings, sidebar, and clean reading experience. Prioritize typography and readability.",
            Self::Ecommerce => "Create an e-commerce product page or catalog with product grids, filters, and shopping cart elements. Focus on product presentation.",
            Self::Dashboard => "Create a clean dashboard interface with data visualization placeholders, navigation, and modern UI components.",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationMode {
    Create,
    Modify { prior: Artifact },
    Specialized { kind: SiteKind, requirements: Option<String> },
}

/// One submitted request. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub description: String,
    pub mode: GenerationMode,
}

impl GenerationRequest {
    pub fn create(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            mode: GenerationMode::Create,
        }
    }

    pub fn modify(description: impl Into<String>, prior: Artifact) -> Self {
        Self {
            description: description.into(),
            mode: GenerationMode::Modify { prior },
        }
    }

    pub fn specialized(description: impl Into<String>, kind: SiteKind, requirements: Option<String>) -> Self {
        Self {
            description: description.into(),
            mode: GenerationMode::Specialized { kind, requirements },
        }
    }

    pub fn mode_name(&self) -> &'static str {
        match &self.mode {
            GenerationMode::Create => "create",
            GenerationMode::Modify { .. } => "modify",
            GenerationMode::Specialized { kind, .. } => kind.as_str(),
        }
    }

    pub fn system_prompt(&self) -> String {
        match &self.mode {
            GenerationMode::Create => CREATE_SYSTEM.to_string(),
            GenerationMode::Modify { .. } => MODIFY_SYSTEM.to_string(),
            GenerationMode::Specialized { kind, .. } => format!(
                "You are an expert web developer specializing in {} websites. Create modern, conversion-focused designs that follow industry best practices.\n\n{}\n\n{}",
                kind.as_str(),
                kind.brief(),
                SPECIALIZED_REQUIREMENTS
            ),
        }
    }

    pub fn user_prompt(&self) -> String {
        let description = self.description.trim();
        match &self.mode {
            GenerationMode::Create => format!(
                "Create a complete, modern website with the following description: \"{description}\"

Requirements:
- Fully responsive design that works on desktop, tablet, and mobile
- Modern, professional appearance with good visual hierarchy
- Include proper navigation if multiple sections are needed
- Use contemporary design trends (subtle shadows, rounded corners, good spacing)
- Ensure all interactive elements have hover states
- Include placeholder content that makes sense for the concept
- Use a cohesive color scheme throughout
- Make it visually engaging and user-friendly

{FORMAT_REMINDER}"
            ),
            GenerationMode::Modify { prior } => format!(
                "Current HTML:
```html
{html}
```

Current CSS:
```css
{css}
```

Modification Request: \"{description}\"

Please implement the requested modification while:
- Maintaining the existing design aesthetic and functionality
- Ensuring the changes work responsively across all devices
- Keeping the code clean and well-organized
- Preserving any existing interactive elements
- Making sure all related styles are updated for consistency

Return the complete updated HTML and CSS separately, enclosed in code blocks (```html ... ``` and ```css ... ```).",
                html = prior.html,
                css = prior.css,
            ),
            GenerationMode::Specialized { kind, requirements } => {
                let extra = requirements
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(|r| format!("Additional Requirements: {r}\n\n"))
                    .unwrap_or_default();
                format!(
                    "Create a {kind} website: \"{description}\"

{extra}Make it modern, professional, and fully functional. Include realistic placeholder content and ensure excellent user experience across all devices.

{FORMAT_REMINDER}",
                    kind = kind.as_str(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_prompt_embeds_description() {
        let req = GenerationRequest::create("  a bakery landing page ");
        let user = req.user_prompt();
        assert!(user.contains("\"a bakery landing page\""));
        assert!(user.ends_with(FORMAT_REMINDER));
        assert!(req.system_prompt().contains("exactly two code blocks"));
    }

    #[test]
    fn modify_prompt_carries_prior_code_verbatim() {
        let prior = Artifact::new("<h1>Bread</h1>\n", "h1{color:red}\n");
        let req = GenerationRequest::modify("make the heading blue", prior);
        let user = req.user_prompt();
        assert!(user.contains("```html\n<h1>Bread</h1>\n\n```"));
        assert!(user.contains("```css\nh1{color:red}\n\n```"));
        assert!(user.contains("Modification Request: \"make the heading blue\""));
        assert_eq!(req.mode_name(), "modify");
        assert!(req.system_prompt().starts_with("You are an expert web developer making modifications"));
    }

    #[test]
    fn specialized_prompt_names_the_kind() {
        let req = GenerationRequest::specialized("indie game studio", SiteKind::Portfolio, Some("dark theme".into()));
        assert!(req.system_prompt().contains("specializing in portfolio websites"));
        assert!(req.system_prompt().contains("project showcases"));
        let user = req.user_prompt();
        assert!(user.starts_with("Create a portfolio website: \"indie game studio\""));
        assert!(user.contains("Additional Requirements: dark theme"));
    }

    #[test]
    fn blank_requirements_are_omitted() {
        let req = GenerationRequest::specialized("shop", SiteKind::Ecommerce, Some("   ".into()));
        assert!(!req.user_prompt().contains("Additional Requirements"));
    }
}
