//! The shopping-session record and its numeric feature encoding.

use std::fmt;

/// Feature column names, in the order produced by [`Session::features`].
pub const FEATURE_NAMES: [&str; 8] = [
    "Administrative",
    "Product",
    "Information",
    "BounceRate",
    "ExitRate",
    "PageValue",
    "VisitorType",
    "Weekend",
];

/// Return [`FEATURE_NAMES`] as owned strings.
#[must_use]
pub fn feature_names() -> Vec<String> {
    FEATURE_NAMES.iter().map(|s| (*s).to_string()).collect()
}

/// Kind of visitor behind a session.
///
/// Any label other than the two known ones reads as [`VisitorType::Other`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum VisitorType {
    /// A visitor seen before.
    #[serde(rename = "Returning_Visitor")]
    Returning,
    /// A first-time visitor.
    #[serde(rename = "New_Visitor")]
    New,
    /// Unknown or untracked visitor.
    #[serde(other)]
    Other,
}

impl VisitorType {
    /// Binary encoding: 1.0 for returning visitors, 0.0 otherwise.
    #[must_use]
    pub fn encode(self) -> f64 {
        match self {
            VisitorType::Returning => 1.0,
            VisitorType::New | VisitorType::Other => 0.0,
        }
    }
}

impl fmt::Display for VisitorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VisitorType::Returning => "Returning_Visitor",
            VisitorType::New => "New_Visitor",
            VisitorType::Other => "Other",
        })
    }
}

/// One browsing session and whether it ended in a purchase.
///
/// Field names serialize to the CSV header
/// `Administrative,Product,Information,BounceRate,ExitRate,PageValue,VisitorType,Weekend,Purchase`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Session {
    /// Account-settings pages visited.
    #[serde(rename = "Administrative")]
    pub administrative: u32,
    /// Product pages visited.
    #[serde(rename = "Product")]
    pub product: u32,
    /// Information pages visited.
    #[serde(rename = "Information")]
    pub information: u32,
    /// Fraction of visitors leaving after one page.
    #[serde(rename = "BounceRate")]
    pub bounce_rate: f64,
    /// Fraction of page views that were the last in a session.
    #[serde(rename = "ExitRate")]
    pub exit_rate: f64,
    /// Average value of the pages visited.
    #[serde(rename = "PageValue")]
    pub page_value: f64,
    /// Returning, new, or other visitor.
    #[serde(rename = "VisitorType")]
    pub visitor_type: VisitorType,
    /// 1 if the session happened on a weekend.
    #[serde(rename = "Weekend")]
    pub weekend: u8,
    /// 1 if the session ended in a purchase.
    #[serde(rename = "Purchase", alias = "purchase")]
    pub purchase: u8,
}

impl Session {
    /// Encode the session as a feature row aligned with [`FEATURE_NAMES`].
    #[must_use]
    pub fn features(&self) -> Vec<f64> {
        vec![
            f64::from(self.administrative),
            f64::from(self.product),
            f64::from(self.information),
            self.bounce_rate,
            self.exit_rate,
            self.page_value,
            self.visitor_type.encode(),
            f64::from(self.weekend),
        ]
    }

    /// Return the purchase label.
    #[must_use]
    pub fn label(&self) -> u8 {
        self.purchase
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            administrative: 2,
            product: 11,
            information: 0,
            bounce_rate: 0.25,
            exit_rate: 0.5,
            page_value: 12.5,
            visitor_type: VisitorType::Returning,
            weekend: 1,
            purchase: 0,
        }
    }

    #[test]
    fn features_follow_name_order() {
        let row = session().features();
        assert_eq!(row.len(), FEATURE_NAMES.len());
        assert_eq!(row, vec![2.0, 11.0, 0.0, 0.25, 0.5, 12.5, 1.0, 1.0]);
    }

    #[test]
    fn visitor_encoding() {
        assert_eq!(VisitorType::Returning.encode(), 1.0);
        assert_eq!(VisitorType::New.encode(), 0.0);
        assert_eq!(VisitorType::Other.encode(), 0.0);
    }

    #[test]
    fn visitor_display_matches_csv_labels() {
        assert_eq!(VisitorType::Returning.to_string(), "Returning_Visitor");
        assert_eq!(VisitorType::New.to_string(), "New_Visitor");
    }

    #[test]
    fn owned_feature_names() {
        let names = feature_names();
        assert_eq!(names.first().map(String::as_str), Some("Administrative"));
        assert_eq!(names.last().map(String::as_str), Some("Weekend"));
    }
}
