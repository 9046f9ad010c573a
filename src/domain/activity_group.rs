//! # Activity Grouping
//!
//! Reshapes per-product query results into groups keyed by activity name so the
//! user can cancel one activity across many products at once.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::activity::{ActivityEnrollment, ProductActivityResult, activity_type_label};

/// One enrollment inside a group, with its checkbox state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityGroupItem {
    pub enrollment: ActivityEnrollment,
    pub selected: bool,
}

impl ActivityGroupItem {
    #[must_use]
    pub fn new(enrollment: ActivityEnrollment) -> Self {
        Self { enrollment, selected: false }
    }

    #[must_use]
    pub fn product_id(&self) -> &str {
        &self.enrollment.product_id
    }

    #[must_use]
    pub fn enroll_id(&self) -> &str {
        &self.enrollment.enroll_id
    }

    #[must_use]
    pub fn activity_name(&self) -> &str {
        &self.enrollment.activity_name
    }
}

/// All enrollments sharing an activity name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityGroup {
    pub activity_name: String,
    pub activity_type: i32,
    pub items: Vec<ActivityGroupItem>,
    /// Distinct products, fixed at construction
    pub product_count: usize,
    /// Enrollment records, fixed at construction
    pub total_enrollments: usize,
    pub expanded: bool,
    pub selected: bool,
}

impl ActivityGroup {
    #[must_use]
    pub const fn type_label(&self) -> &'static str {
        activity_type_label(self.activity_type)
    }

    #[must_use]
    pub fn selected_count(&self) -> usize {
        self.items.iter().filter(|item| item.selected).count()
    }
}

/// Ordered set of groups for the current batch session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityGroups {
    pub(crate) groups: Vec<ActivityGroup>,
}

impl ActivityGroups {
    #[must_use]
    pub fn as_slice(&self) -> &[ActivityGroup] {
        &self.groups
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    #[must_use]
    pub fn get(&self, activity_name: &str) -> Option<&ActivityGroup> {
        self.groups.iter().find(|g| g.activity_name == activity_name)
    }

    pub(crate) fn get_mut(&mut self, activity_name: &str) -> Option<&mut ActivityGroup> {
        self.groups.iter_mut().find(|g| g.activity_name == activity_name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ActivityGroup> {
        self.groups.iter()
    }

    #[must_use]
    pub fn total_items(&self) -> usize {
        self.groups.iter().map(|g| g.items.len()).sum()
    }
}

impl<'a> IntoIterator for &'a ActivityGroups {
    type Item = &'a ActivityGroup;
    type IntoIter = std::slice::Iter<'a, ActivityGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

struct GroupBuilder {
    activity_name: String,
    activity_type: i32,
    items: Vec<ActivityGroupItem>,
    products: HashSet<String>,
    total_enrollments: usize,
}

impl GroupBuilder {
    fn finish(self) -> ActivityGroup {
        ActivityGroup {
            activity_name: self.activity_name,
            activity_type: self.activity_type,
            product_count: self.products.len(),
            total_enrollments: self.total_enrollments,
            items: self.items,
            expanded: true,
            selected: false,
        }
    }
}

/// Groups every enrollment of every product by activity name.
///
/// Groups keep first-encounter order and are then stable-sorted by distinct
/// product count, broadest first. Activities without enrollments add nothing.
pub fn group_activities<'a, I>(results: I) -> ActivityGroups
where
    I: IntoIterator<Item = &'a ProductActivityResult>,
{
    let mut builders: Vec<GroupBuilder> = Vec::new();
    let mut index_by_name: HashMap<String, usize> = HashMap::new();

    for result in results {
        for activity in &result.activities {
            for enrollment in &activity.enrollments {
                let slot = *index_by_name
                    .entry(activity.activity_name.clone())
                    .or_insert_with(|| {
                        builders.push(GroupBuilder {
                            activity_name: activity.activity_name.clone(),
                            activity_type: activity.activity_type,
                            items: Vec::new(),
                            products: HashSet::new(),
                            total_enrollments: 0,
                        });
                        builders.len() - 1
                    });

                let builder = &mut builders[slot];
                builder.items.push(ActivityGroupItem::new(enrollment.clone()));
                builder.products.insert(enrollment.product_id.clone());
                builder.total_enrollments += 1;
            }
        }
    }

    let mut groups: Vec<ActivityGroup> = builders.into_iter().map(GroupBuilder::finish).collect();
    groups.sort_by(|a, b| b.product_count.cmp(&a.product_count));

    ActivityGroups { groups }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::super::activity::{ProductActivity, ProductInfo};
    use super::*;

    pub fn enrollment(product_id: &str, enroll_id: &str, activity_name: &str) -> ActivityEnrollment {
        ActivityEnrollment {
            product_id: product_id.to_string(),
            enroll_id: enroll_id.to_string(),
            activity_name: activity_name.to_string(),
            activity_type: 1,
            price_range_minor: (1000, 1200),
            stock: 10,
            enroll_timestamp: None,
            site_sessions: Vec::new(),
        }
    }

    /// `activities`: (activity name, enroll ids)
    pub fn product(product_id: &str, activities: &[(&str, &[&str])]) -> ProductActivityResult {
        ProductActivityResult {
            info: ProductInfo {
                product_id: product_id.to_string(),
                product_name: Some(format!("Product {product_id}")),
                image_url: None,
            },
            activities: activities
                .iter()
                .map(|(name, enroll_ids)| ProductActivity {
                    activity_name: (*name).to_string(),
                    activity_type: 1,
                    enrollments: enroll_ids
                        .iter()
                        .map(|id| enrollment(product_id, id, name))
                        .collect(),
                })
                .collect(),
        }
    }
}
