//! In-process `Store` used by the test suite and `serve --memory`

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DbError, NewAttachment, NewOrder, NewUser, OrderListQuery, OrderScope, Store};
use crate::models::{
    Attachment, ClientSummary, Lab, LabCard, LabLocation, LabProfile, LabService, LabSummary,
    Order, OrderFact, OrderStatus, OrderView, Paginated, Pagination, PricingMode,
    ServiceCategory, ServiceDraft, ServiceFilter, ServiceSummary, ServiceWithLab, User, UserRole,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    labs: Vec<Lab>,
    services: Vec<LabService>,
    orders: Vec<Order>,
    attachments: Vec<Attachment>,
}

impl Tables {
    fn view(&self, order: &Order) -> Result<OrderView, DbError> {
        let missing = |resource: &'static str, id: Uuid| DbError::NotFound {
            resource,
            id: id.to_string(),
        };
        let service = self
            .services
            .iter()
            .find(|s| s.id == order.service_id)
            .ok_or_else(|| missing("service", order.service_id))?;
        let lab = self
            .labs
            .iter()
            .find(|l| l.id == order.lab_id)
            .ok_or_else(|| missing("lab", order.lab_id))?;
        let client = self
            .users
            .iter()
            .find(|u| u.id == order.client_id)
            .ok_or_else(|| missing("user", order.client_id))?;

        Ok(OrderView {
            order: order.clone(),
            service: ServiceSummary {
                id: service.id,
                name: service.name.clone(),
                category: service.category,
                pricing_mode: service.pricing_mode,
            },
            lab: LabSummary {
                id: lab.id,
                name: lab.name.clone(),
                owner_id: lab.owner_id,
            },
            client: ClientSummary {
                id: client.id,
                name: client.name.clone(),
                email: client.email.clone(),
            },
            attachments: self
                .attachments
                .iter()
                .filter(|a| a.order_id == order.id)
                .cloned()
                .collect(),
        })
    }
}

/// `Store` holding every row in memory behind a tokio `RwLock`
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with one account per role, a lab and one service
    /// per pricing mode. Accounts have no password (email-only sign-in).
    pub fn with_demo_data() -> Self {
        let now = Utc::now();
        let user = |name: &str, email: &str, role| User {
            id: Uuid::new_v4(),
            name: Some(name.to_owned()),
            email: email.to_owned(),
            role,
            password_hash: None,
            created_at: now,
            updated_at: now,
        };
        let admin = user("Platform Admin", "admin@pipetgo.test", UserRole::Admin);
        let client = user("Ana Reyes", "client@pipetgo.test", UserRole::Client);
        let lab_admin = user("Maria Santos", "lab@pipetgo.test", UserRole::LabAdmin);

        let lab = Lab {
            id: Uuid::new_v4(),
            owner_id: lab_admin.id,
            name: "Metro Manila Analytical Laboratory".into(),
            description: Some("ISO 17025 accredited chemical and microbiological testing".into()),
            location: Some(LabLocation {
                address: "123 Rizal Street".into(),
                city: "Quezon City".into(),
                state: "Metro Manila".into(),
                country: "Philippines".into(),
                postal_code: "1100".into(),
                coordinates: None,
            }),
            certifications: vec!["ISO/IEC 17025".into()],
            created_at: now,
            updated_at: now,
        };

        let service = |name: &str, category, mode, price: Option<f64>| LabService {
            id: Uuid::new_v4(),
            lab_id: lab.id,
            name: name.to_owned(),
            description: None,
            category,
            pricing_mode: mode,
            price_per_unit: price,
            unit_type: "per_sample".into(),
            turnaround_days: Some(7),
            sample_requirements: None,
            active: true,
            created_at: now,
            updated_at: now,
        };
        let services = vec![
            service(
                "Heavy Metals Panel",
                ServiceCategory::ChemicalAnalysis,
                PricingMode::Fixed,
                Some(3500.0),
            ),
            service(
                "Custom Contaminant Screening",
                ServiceCategory::EnvironmentalTesting,
                PricingMode::QuoteRequired,
                None,
            ),
            service(
                "Total Plate Count",
                ServiceCategory::MicrobiologicalTesting,
                PricingMode::Hybrid,
                Some(1200.0),
            ),
        ];

        Self {
            tables: RwLock::new(Tables {
                users: vec![admin, client, lab_admin],
                labs: vec![lab],
                services,
                ..Default::default()
            }),
        }
    }
}

fn service_matches(filter: &ServiceFilter, s: &LabService) -> bool {
    if filter.active_only && !s.active {
        return false;
    }
    if let Some(category) = &filter.category {
        if s.category.as_str() != category {
            return false;
        }
    }
    if let Some(lab_id) = filter.lab_id {
        if s.lab_id != lab_id {
            return false;
        }
    }
    if let Some(search) = &filter.search {
        let needle = search.to_lowercase();
        let hit = s.name.to_lowercase().contains(&needle)
            || s
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
        if !hit {
            return false;
        }
    }
    true
}

fn apply_draft(service: &mut LabService, draft: ServiceDraft) {
    service.name = draft.name;
    service.description = draft.description;
    service.category = draft.category;
    service.pricing_mode = draft.pricing_mode;
    service.price_per_unit = draft.price_per_unit;
    service.unit_type = draft.unit_type;
    service.turnaround_days = draft.turnaround_days;
    service.sample_requirements = draft.sample_requirements;
    service.updated_at = Utc::now();
}

/// NUMERIC(12,2) rounding so both stores return the same amounts
fn cents(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[async_trait]
impl Store for MemoryStore {
    async fn user_by_id(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        let t = self.tables.read().await;
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, new: NewUser) -> Result<User, DbError> {
        let mut t = self.tables.write().await;
        if t.users.iter().any(|u| u.email == new.email) {
            return Err(DbError::Conflict {
                resource: "user",
                detail: new.email,
            });
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            role: new.role,
            password_hash: new.password_hash,
            created_at: now,
            updated_at: now,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn set_initial_password(&self, user_id: Uuid, hash: &str) -> Result<bool, DbError> {
        let mut t = self.tables.write().await;
        match t
            .users
            .iter_mut()
            .find(|u| u.id == user_id && u.password_hash.is_none())
        {
            Some(user) => {
                user.password_hash = Some(hash.to_owned());
                user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn count_users(&self, role: UserRole) -> Result<i64, DbError> {
        let t = self.tables.read().await;
        Ok(t.users.iter().filter(|u| u.role == role).count() as i64)
    }

    async fn lab_by_owner(&self, owner_id: Uuid) -> Result<Option<Lab>, DbError> {
        let t = self.tables.read().await;
        Ok(t.labs.iter().find(|l| l.owner_id == owner_id).cloned())
    }

    async fn upsert_lab(&self, owner_id: Uuid, profile: LabProfile) -> Result<Lab, DbError> {
        let mut t = self.tables.write().await;
        let now = Utc::now();
        if let Some(lab) = t.labs.iter_mut().find(|l| l.owner_id == owner_id) {
            lab.name = profile.name;
            lab.description = profile.description;
            lab.location = profile.location;
            lab.certifications = profile.certifications;
            lab.updated_at = now;
            return Ok(lab.clone());
        }
        let lab = Lab {
            id: Uuid::new_v4(),
            owner_id,
            name: profile.name,
            description: profile.description,
            location: profile.location,
            certifications: profile.certifications,
            created_at: now,
            updated_at: now,
        };
        t.labs.push(lab.clone());
        Ok(lab)
    }

    async fn count_labs(&self) -> Result<i64, DbError> {
        let t = self.tables.read().await;
        Ok(t.labs.len() as i64)
    }

    async fn list_services(
        &self,
        filter: &ServiceFilter,
        page: Pagination,
    ) -> Result<Paginated<ServiceWithLab>, DbError> {
        let t = self.tables.read().await;
        let labs: HashMap<Uuid, &Lab> = t.labs.iter().map(|l| (l.id, l)).collect();

        // newest first; later inserts win ties
        let mut matching: Vec<&LabService> = t
            .services
            .iter()
            .rev()
            .filter(|s| service_matches(filter, s))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .filter_map(|s| {
                labs.get(&s.lab_id).map(|lab| ServiceWithLab {
                    service: s.clone(),
                    lab: LabCard::from(*lab),
                })
            })
            .collect();

        Ok(Paginated::new(items, total, page))
    }

    async fn service_by_id(&self, id: Uuid) -> Result<Option<LabService>, DbError> {
        let t = self.tables.read().await;
        Ok(t.services.iter().find(|s| s.id == id).cloned())
    }

    async fn create_service(&self, lab_id: Uuid, draft: ServiceDraft) -> Result<LabService, DbError> {
        let mut t = self.tables.write().await;
        if !t.labs.iter().any(|l| l.id == lab_id) {
            return Err(DbError::NotFound {
                resource: "lab",
                id: lab_id.to_string(),
            });
        }
        let now = Utc::now();
        let service = LabService {
            id: Uuid::new_v4(),
            lab_id,
            name: draft.name,
            description: draft.description,
            category: draft.category,
            pricing_mode: draft.pricing_mode,
            price_per_unit: draft.price_per_unit.map(cents),
            unit_type: draft.unit_type,
            turnaround_days: draft.turnaround_days,
            sample_requirements: draft.sample_requirements,
            active: true,
            created_at: now,
            updated_at: now,
        };
        t.services.push(service.clone());
        Ok(service)
    }

    async fn update_service(
        &self,
        id: Uuid,
        lab_id: Uuid,
        mut draft: ServiceDraft,
    ) -> Result<Option<LabService>, DbError> {
        let mut t = self.tables.write().await;
        draft.price_per_unit = draft.price_per_unit.map(cents);
        Ok(t
            .services
            .iter_mut()
            .find(|s| s.id == id && s.lab_id == lab_id)
            .map(|s| {
                apply_draft(s, draft);
                s.clone()
            }))
    }

    async fn set_service_active(
        &self,
        id: Uuid,
        lab_id: Uuid,
        active: bool,
    ) -> Result<Option<LabService>, DbError> {
        let mut t = self.tables.write().await;
        Ok(t
            .services
            .iter_mut()
            .find(|s| s.id == id && s.lab_id == lab_id)
            .map(|s| {
                s.active = active;
                s.updated_at = Utc::now();
                s.clone()
            }))
    }

    async fn count_owned_services(&self, lab_id: Uuid, ids: &[Uuid]) -> Result<i64, DbError> {
        let t = self.tables.read().await;
        Ok(t.services
            .iter()
            .filter(|s| s.lab_id == lab_id && ids.contains(&s.id))
            .count() as i64)
    }

    async fn bulk_set_active(&self, lab_id: Uuid, ids: &[Uuid], active: bool) -> Result<u64, DbError> {
        let mut t = self.tables.write().await;
        let now = Utc::now();
        let mut changed = 0;
        for s in t
            .services
            .iter_mut()
            .filter(|s| s.lab_id == lab_id && ids.contains(&s.id))
        {
            s.active = active;
            s.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }

    async fn create_order(&self, new: NewOrder) -> Result<OrderView, DbError> {
        let mut t = self.tables.write().await;
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            client_id: new.client_id,
            lab_id: new.lab_id,
            service_id: new.service_id,
            status: new.status,
            client_details: new.client_details,
            sample_description: new.sample_description,
            special_instructions: new.special_instructions,
            quoted_price: new.quoted_price.map(cents),
            quoted_at: new.quoted_at,
            quote_notes: None,
            estimated_turnaround_days: None,
            quote_approved_at: None,
            quote_rejected_at: None,
            quote_rejected_reason: None,
            acknowledged_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        // foreign keys
        let view = t.view(&order)?;
        t.orders.push(order);
        Ok(view)
    }

    async fn order_view(&self, id: Uuid) -> Result<Option<OrderView>, DbError> {
        let t = self.tables.read().await;
        t.orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| t.view(o))
            .transpose()
    }

    async fn list_orders(&self, query: &OrderListQuery) -> Result<Vec<OrderView>, DbError> {
        let t = self.tables.read().await;
        let mut orders: Vec<&Order> = t
            .orders
            .iter()
            .rev()
            .filter(|o| query.scope.contains(o))
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = query.limit {
            orders.truncate(limit as usize);
        }
        orders.into_iter().map(|o| t.view(o)).collect()
    }

    async fn save_order_if_status(
        &self,
        order: &Order,
        expected: OrderStatus,
    ) -> Result<bool, DbError> {
        let mut t = self.tables.write().await;
        let Some(stored) = t
            .orders
            .iter_mut()
            .find(|o| o.id == order.id && o.status == expected)
        else {
            return Ok(false);
        };
        stored.status = order.status;
        stored.special_instructions = order.special_instructions.clone();
        stored.quoted_price = order.quoted_price.map(cents);
        stored.quoted_at = order.quoted_at;
        stored.quote_notes = order.quote_notes.clone();
        stored.estimated_turnaround_days = order.estimated_turnaround_days;
        stored.quote_approved_at = order.quote_approved_at;
        stored.quote_rejected_at = order.quote_rejected_at;
        stored.quote_rejected_reason = order.quote_rejected_reason.clone();
        stored.acknowledged_at = order.acknowledged_at;
        stored.completed_at = order.completed_at;
        stored.updated_at = Utc::now();
        Ok(true)
    }

    async fn status_counts(&self, scope: OrderScope) -> Result<Vec<(OrderStatus, i64)>, DbError> {
        let t = self.tables.read().await;
        let mut counts: HashMap<OrderStatus, i64> = HashMap::new();
        for o in t.orders.iter().filter(|o| scope.contains(o)) {
            *counts.entry(o.status).or_default() += 1;
        }
        let mut counts: Vec<_> = counts.into_iter().collect();
        counts.sort();
        Ok(counts)
    }

    async fn completed_revenue(&self, scope: OrderScope) -> Result<f64, DbError> {
        let t = self.tables.read().await;
        Ok(t.orders
            .iter()
            .filter(|o| scope.contains(o) && o.status == OrderStatus::Completed)
            .filter_map(|o| o.quoted_price)
            .sum())
    }

    async fn order_facts(
        &self,
        lab_id: Uuid,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<OrderFact>, DbError> {
        let t = self.tables.read().await;
        Ok(t.orders
            .iter()
            .filter(|o| o.lab_id == lab_id)
            .filter(|o| since.map_or(true, |since| o.created_at >= since))
            .map(|o| OrderFact {
                service_id: o.service_id,
                service_name: t
                    .services
                    .iter()
                    .find(|s| s.id == o.service_id)
                    .map(|s| s.name.clone())
                    .unwrap_or_default(),
                status: o.status,
                quoted_price: o.quoted_price,
                created_at: o.created_at,
            })
            .collect())
    }

    async fn create_attachment(&self, new: NewAttachment) -> Result<Attachment, DbError> {
        let mut t = self.tables.write().await;
        if !t.orders.iter().any(|o| o.id == new.order_id) {
            return Err(DbError::NotFound {
                resource: "order",
                id: new.order_id.to_string(),
            });
        }
        if !t.users.iter().any(|u| u.id == new.uploaded_by_id) {
            return Err(DbError::NotFound {
                resource: "user",
                id: new.uploaded_by_id.to_string(),
            });
        }
        let attachment = Attachment {
            id: Uuid::new_v4(),
            order_id: new.order_id,
            uploaded_by_id: new.uploaded_by_id,
            file_name: new.file_name,
            file_url: new.file_url,
            file_type: new.file_type,
            file_size: new.file_size,
            attachment_type: new.attachment_type,
            created_at: Utc::now(),
        };
        t.attachments.push(attachment.clone());
        Ok(attachment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClientDetails, ShippingAddress};

    fn details() -> ClientDetails {
        ClientDetails {
            contact_email: "client@pipetgo.test".into(),
            contact_phone: None,
            shipping_address: ShippingAddress {
                street: "1 Ayala Ave".into(),
                city: "Makati".into(),
                postal: "1226".into(),
                country: "Philippines".into(),
            },
            organization: None,
        }
    }

    async fn first_order(store: &MemoryStore) -> OrderView {
        let client = store
            .user_by_email("client@pipetgo.test")
            .await
            .unwrap()
            .unwrap();
        let page = store
            .list_services(&ServiceFilter::default(), Pagination::default())
            .await
            .unwrap();
        let service = &page.items[0].service;
        store
            .create_order(NewOrder {
                client_id: client.id,
                lab_id: service.lab_id,
                service_id: service.id,
                status: OrderStatus::Pending,
                client_details: details(),
                sample_description: "Bottled water, 2L".into(),
                special_instructions: None,
                quoted_price: Some(100.0),
                quoted_at: Some(Utc::now()),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::with_demo_data();
        let err = store
            .create_user(NewUser {
                name: None,
                email: "client@pipetgo.test".into(),
                role: UserRole::Client,
                password_hash: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    async fn compare_and_set_rejects_stale_status() {
        let store = MemoryStore::with_demo_data();
        let view = first_order(&store).await;

        let mut order = view.order.clone();
        order.status = OrderStatus::Acknowledged;
        assert!(store
            .save_order_if_status(&order, OrderStatus::Pending)
            .await
            .unwrap());

        // second writer still believes the order is pending
        order.status = OrderStatus::Cancelled;
        assert!(!store
            .save_order_if_status(&order, OrderStatus::Pending)
            .await
            .unwrap());

        let stored = store.order_view(order.id).await.unwrap().unwrap();
        assert_eq!(stored.order.status, OrderStatus::Acknowledged);
    }

    #[tokio::test]
    async fn search_is_case_insensitive() {
        let store = MemoryStore::with_demo_data();
        let filter = ServiceFilter {
            search: Some("PLATE".into()),
            active_only: true,
            ..Default::default()
        };
        let page = store
            .list_services(&filter, Pagination::default())
            .await
            .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].service.name, "Total Plate Count");
    }

    #[tokio::test]
    async fn bulk_only_touches_own_lab() {
        let store = MemoryStore::with_demo_data();
        let page = store
            .list_services(&ServiceFilter::default(), Pagination::default())
            .await
            .unwrap();
        let lab_id = page.items[0].service.lab_id;
        let ids: Vec<Uuid> = page.items.iter().map(|s| s.service.id).collect();

        assert_eq!(store.bulk_set_active(Uuid::new_v4(), &ids, false).await.unwrap(), 0);
        assert_eq!(store.bulk_set_active(lab_id, &ids, false).await.unwrap(), 3);

        let active = store
            .list_services(
                &ServiceFilter {
                    active_only: true,
                    ..Default::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(active.pagination.total_count, 0);
    }

    #[tokio::test]
    async fn attachments_show_up_in_views() {
        let store = MemoryStore::with_demo_data();
        let view = first_order(&store).await;
        store
            .create_attachment(NewAttachment {
                order_id: view.order.id,
                uploaded_by_id: view.lab.owner_id,
                file_name: "results.pdf".into(),
                file_url: "https://files.example.com/results.pdf".into(),
                file_type: "application/pdf".into(),
                file_size: None,
                attachment_type: crate::models::AttachmentType::Result,
            })
            .await
            .unwrap();

        let view = store.order_view(view.order.id).await.unwrap().unwrap();
        assert_eq!(view.attachments.len(), 1);
    }
}
