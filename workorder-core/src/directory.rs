//! Customer directory: lookup, suggestion and uniqueness-checked CRUD.

use chrono::Duration;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::{self, SharedClock};
use crate::config::{keys, StorageConfig, SUGGESTION_LIMIT};
use crate::error::{Result, WorkOrderError};
use crate::history::OrderHistory;
use crate::model::{
    name_key, Customer, CustomerInput, CustomerPatch, CustomerStatistics, FinalizedOrder,
    ImportReport,
};
use crate::store::{load_json, save_json, SharedStore};
use crate::tabular;

/// Owns every customer record and persists the full set after each change.
pub struct CustomerDirectory {
    store: SharedStore,
    key: String,
    clock: SharedClock,
    customers: Vec<Customer>,
}

impl CustomerDirectory {
    /// Load the directory from the store.
    pub fn open(store: SharedStore, storage: &StorageConfig) -> Self {
        Self::with_clock(store, storage, clock::system())
    }

    /// Load the directory with an explicit clock.
    pub fn with_clock(store: SharedStore, storage: &StorageConfig, clock: SharedClock) -> Self {
        let key = storage.key(keys::CUSTOMERS);
        let customers: Vec<Customer> = load_json(store.as_ref(), &key).unwrap_or_default();
        debug!("Loaded {} customers from '{}'", customers.len(), key);
        Self {
            store,
            key,
            clock,
            customers,
        }
    }

    fn persist(&self) -> Result<()> {
        save_json(self.store.as_ref(), &self.key, &self.customers)
    }

    /// Number of customers.
    pub fn len(&self) -> usize {
        self.customers.len()
    }

    /// Check if the directory is empty.
    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }

    /// All customers, alphabetical by name.
    pub fn all(&self) -> Vec<&Customer> {
        let mut all: Vec<&Customer> = self.customers.iter().collect();
        all.sort_by_cached_key(|c| name_key(&c.name));
        all
    }

    /// Next free `Cnnn` code.
    fn next_code(&self) -> String {
        let max = self
            .customers
            .iter()
            .filter_map(|c| {
                let digits = c.code.strip_prefix('C')?;
                if digits.is_empty() || !digits.chars().all(|d| d.is_ascii_digit()) {
                    return None;
                }
                digits.parse::<u32>().ok()
            })
            .max()
            .unwrap_or(0);
        format!("C{:03}", max + 1)
    }

    fn name_taken(&self, name: &str, except_id: Option<&str>) -> bool {
        self.customers
            .iter()
            .any(|c| Some(c.id.as_str()) != except_id && c.has_name(name))
    }

    /// Create a customer.
    ///
    /// The name is required and must be unique ignoring case. A `Cnnn` code is
    /// assigned when the input has none.
    pub fn create(&mut self, input: CustomerInput) -> Result<Customer> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(WorkOrderError::validation("Customer name is required"));
        }
        if self.name_taken(name, None) {
            return Err(WorkOrderError::DuplicateName {
                name: name.to_string(),
            });
        }

        let code = match input.code.as_deref().map(str::trim) {
            Some(code) if !code.is_empty() => code.to_string(),
            _ => self.next_code(),
        };
        let today = self.clock.today();

        let customer = Customer {
            id: format!("CUST_{}", Uuid::new_v4().simple()),
            code,
            name: name.to_string(),
            email: input.email.trim().to_string(),
            phone: input.phone.trim().to_string(),
            address: input.address,
            notes: input.notes.trim().to_string(),
            tags: input.tags,
            created_date: today,
            last_modified: today,
            order_count: 0,
        };

        self.customers.push(customer.clone());
        info!("Customer added: {} ({})", customer.name, customer.code);
        self.persist()?;
        Ok(customer)
    }

    /// Update the provided fields of a customer.
    pub fn update(&mut self, id: &str, patch: CustomerPatch) -> Result<Customer> {
        let index = self
            .customers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| WorkOrderError::not_found("Customer", id))?;

        let new_name = patch
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty());
        if let Some(name) = new_name {
            if self.name_taken(name, Some(id)) {
                return Err(WorkOrderError::DuplicateName {
                    name: name.to_string(),
                });
            }
        }
        let new_name = new_name.map(str::to_string);
        let today = self.clock.today();

        let customer = &mut self.customers[index];
        if let Some(name) = new_name {
            customer.name = name;
        }
        if let Some(email) = patch.email {
            customer.email = email.trim().to_string();
        }
        if let Some(phone) = patch.phone {
            customer.phone = phone.trim().to_string();
        }
        if let Some(address) = patch.address {
            customer.address.merge(address);
        }
        if let Some(notes) = patch.notes {
            customer.notes = notes.trim().to_string();
        }
        if let Some(tags) = patch.tags {
            customer.tags = tags;
        }
        customer.last_modified = today;

        let updated = customer.clone();
        info!("Customer updated: {}", updated.name);
        self.persist()?;
        Ok(updated)
    }

    /// Permanently remove a customer. Historical orders keep their own copy of
    /// the name.
    pub fn delete(&mut self, id: &str) -> Result<Customer> {
        let index = self
            .customers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| WorkOrderError::not_found("Customer", id))?;
        let removed = self.customers.remove(index);
        info!("Customer deleted: {}", removed.name);
        self.persist()?;
        Ok(removed)
    }

    /// Find by id.
    pub fn find_by_id(&self, id: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.id == id)
    }

    /// Find by name, ignoring case and surrounding whitespace.
    pub fn find_by_name(&self, name: &str) -> Option<&Customer> {
        if name.trim().is_empty() {
            return None;
        }
        self.customers.iter().find(|c| c.has_name(name))
    }

    /// Find by exact code.
    pub fn find_by_code(&self, code: &str) -> Option<&Customer> {
        self.customers.iter().find(|c| c.code == code)
    }

    /// Ranked suggestions for free-text input.
    ///
    /// Matches name, code, email or phone containing the input. Names starting
    /// with the input come first, then alphabetical. Blank input lists the
    /// first customers alphabetically.
    pub fn suggest(&self, input: &str) -> Vec<&Customer> {
        let term = input.trim().to_lowercase();
        if term.is_empty() {
            return self.all().into_iter().take(SUGGESTION_LIMIT).collect();
        }
        let name_term = name_key(input);

        let mut matches: Vec<&Customer> = self
            .customers
            .iter()
            .filter(|c| {
                name_key(&c.name).contains(&name_term)
                    || c.code.to_lowercase().contains(&term)
                    || c.email.to_lowercase().contains(&term)
                    || c.phone.contains(&term)
            })
            .collect();

        matches.sort_by_cached_key(|c| {
            let name = name_key(&c.name);
            (!name.starts_with(&name_term), name)
        });
        matches.truncate(SUGGESTION_LIMIT);
        matches
    }

    /// Refresh the order count of the customer called `name` from history.
    pub fn update_stats(&mut self, name: &str, history: &OrderHistory) -> Result<()> {
        let Some(customer) = self.customers.iter_mut().find(|c| c.has_name(name)) else {
            debug!("No customer named '{}' to update", name);
            return Ok(());
        };
        customer.order_count = history.count_for_customer(name) as u32;
        debug!("{} now has {} orders", customer.name, customer.order_count);
        self.persist()
    }

    /// Orders placed by the customer with `id`, newest first.
    pub fn history_for<'h>(
        &self,
        id: &str,
        history: &'h OrderHistory,
    ) -> Result<Vec<&'h FinalizedOrder>> {
        let customer = self
            .find_by_id(id)
            .ok_or_else(|| WorkOrderError::not_found("Customer", id))?;
        Ok(history.orders_by_customer(&customer.name))
    }

    /// Add customers in bulk; name clashes and invalid records are skipped.
    pub fn import(&mut self, records: Vec<CustomerInput>) -> ImportReport {
        let mut report = ImportReport::default();
        for record in records {
            if self.find_by_name(&record.name).is_some() {
                report.skipped += 1;
                continue;
            }
            match self.create(record) {
                Ok(_) => report.imported += 1,
                Err(WorkOrderError::StorageFull { key }) => {
                    // The record is in memory; later writes will retry.
                    warn!("Imported customer not yet persisted (storage full: {})", key);
                    report.imported += 1;
                }
                Err(e) => {
                    warn!("Skipped invalid customer: {}", e);
                    report.skipped += 1;
                }
            }
        }
        info!(
            "Customer import: {} imported, {} skipped",
            report.imported, report.skipped
        );
        report
    }

    /// Import from JSON: a bare array or an export envelope.
    pub fn import_json(&mut self, content: &str) -> Result<ImportReport> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Payload {
            List(Vec<CustomerInput>),
            Envelope { customers: Vec<CustomerInput> },
        }

        let records = match serde_json::from_str(content)? {
            Payload::List(records) => records,
            Payload::Envelope { customers } => customers,
        };
        Ok(self.import(records))
    }

    /// Export envelope with date, count and records.
    pub fn export_json(&self) -> Result<String> {
        let envelope = serde_json::json!({
            "exportDate": self.clock.now_utc().to_rfc3339(),
            "customerCount": self.customers.len(),
            "customers": self.customers,
        });
        Ok(serde_json::to_string_pretty(&envelope)?)
    }

    /// Spreadsheet export: name, email, phone, address, tag, total orders.
    pub fn export_csv(&self) -> String {
        let mut output = String::new();
        tabular::write_row(
            &mut output,
            ["Name", "Email", "Phone", "Address", "Tag", "Total Orders"],
        );
        for customer in self.all() {
            tabular::write_row(
                &mut output,
                [
                    customer.name.clone(),
                    customer.email.clone(),
                    customer.phone.clone(),
                    customer.address.one_line(),
                    customer.tags.join("; "),
                    customer.order_count.to_string(),
                ],
            );
        }
        output
    }

    /// Directory-wide counters.
    pub fn statistics(&self) -> CustomerStatistics {
        let cutoff = self.clock.today() - Duration::days(30);
        CustomerStatistics {
            total_customers: self.customers.len(),
            customers_with_email: self.customers.iter().filter(|c| !c.email.is_empty()).count(),
            customers_with_phone: self.customers.iter().filter(|c| !c.phone.is_empty()).count(),
            customers_with_orders: self.customers.iter().filter(|c| c.order_count > 0).count(),
            recent_customers: self
                .customers
                .iter()
                .filter(|c| c.created_date >= cutoff)
                .count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::ErrorCode;
    use crate::model::{Address, AddressPatch};
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn directory() -> CustomerDirectory {
        CustomerDirectory::with_clock(
            Arc::new(MemoryStore::new()),
            &StorageConfig::default(),
            Arc::new(FixedClock::at(2024, 5, 20, 10, 0)),
        )
    }

    fn named(name: &str) -> CustomerInput {
        CustomerInput::named(name)
    }

    // ==================== create tests ====================

    #[test]
    fn test_create_assigns_sequential_codes() {
        let mut dir = directory();
        let a = dir.create(named("Ayşe Yılmaz")).unwrap();
        let b = dir.create(named("Mehmet Demir")).unwrap();
        assert_eq!(a.code, "C001");
        assert_eq!(b.code, "C002");
        assert_eq!(a.created_date.to_string(), "2024-05-20");
    }

    #[test]
    fn test_create_code_follows_max_existing() {
        let mut dir = directory();
        dir.create(CustomerInput {
            code: Some("C041".to_string()),
            ..named("First")
        })
        .unwrap();
        dir.create(CustomerInput {
            code: Some("VIP".to_string()),
            ..named("Second")
        })
        .unwrap();
        assert_eq!(dir.create(named("Third")).unwrap().code, "C042");
    }

    #[test]
    fn test_create_rejects_blank_name() {
        let mut dir = directory();
        let err = dir.create(named("   ")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::Validation);
        assert!(dir.is_empty());
    }

    #[test]
    fn test_create_rejects_case_insensitive_duplicate() {
        let mut dir = directory();
        dir.create(named("Ayşe Yılmaz")).unwrap();
        let err = dir.create(named("  AYŞE YILMAZ ")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateName);
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_create_trims_fields() {
        let mut dir = directory();
        let c = dir
            .create(CustomerInput {
                email: "  ayse@example.com ".to_string(),
                ..named("  Ayşe  ")
            })
            .unwrap();
        assert_eq!(c.name, "Ayşe");
        assert_eq!(c.email, "ayse@example.com");
    }

    // ==================== update / delete tests ====================

    #[test]
    fn test_update_unknown_id() {
        let mut dir = directory();
        let err = dir.update("missing", CustomerPatch::default()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_update_rename_to_own_name_in_other_case() {
        let mut dir = directory();
        let c = dir.create(named("ali veli")).unwrap();
        let updated = dir
            .update(
                &c.id,
                CustomerPatch {
                    name: Some("Ali Veli".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Ali Veli");
    }

    #[test]
    fn test_update_rename_clash() {
        let mut dir = directory();
        dir.create(named("Ali")).unwrap();
        let b = dir.create(named("Veli")).unwrap();
        let err = dir
            .update(
                &b.id,
                CustomerPatch {
                    name: Some("ALI".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::DuplicateName);
        assert_eq!(dir.find_by_id(&b.id).unwrap().name, "Veli");
    }

    #[test]
    fn test_update_merges_address_fields() {
        let mut dir = directory();
        let c = dir
            .create(CustomerInput {
                address: Address {
                    street: "Çarşı Sk. 3".to_string(),
                    city: "Bursa".to_string(),
                    ..Default::default()
                },
                ..named("Zeynep")
            })
            .unwrap();

        let updated = dir
            .update(
                &c.id,
                CustomerPatch {
                    phone: Some("0555 111 22 33".to_string()),
                    address: Some(AddressPatch {
                        zip: Some("16000".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.address.street, "Çarşı Sk. 3");
        assert_eq!(updated.address.city, "Bursa");
        assert_eq!(updated.address.zip, "16000");
        assert_eq!(updated.phone, "0555 111 22 33");
        assert_eq!(updated.name, "Zeynep");
    }

    #[test]
    fn test_delete() {
        let mut dir = directory();
        let c = dir.create(named("Temp")).unwrap();
        dir.delete(&c.id).unwrap();
        assert!(dir.find_by_id(&c.id).is_none());
        assert_eq!(dir.delete(&c.id).unwrap_err().code(), ErrorCode::NotFound);
    }

    // ==================== lookup / suggest tests ====================

    #[test]
    fn test_find_by_name_and_code() {
        let mut dir = directory();
        let c = dir.create(named("Ayşe Yılmaz")).unwrap();
        assert_eq!(dir.find_by_name(" ayşe yılmaz ").unwrap().id, c.id);
        assert_eq!(dir.find_by_code("C001").unwrap().id, c.id);
        assert!(dir.find_by_name("").is_none());
    }

    #[test]
    fn test_suggest_prefix_first_then_alphabetical() {
        let mut dir = directory();
        for name in ["Zeki Ali", "Alper", "Bali Kaya", "Ali Can"] {
            dir.create(named(name)).unwrap();
        }
        let names: Vec<&str> = dir.suggest("ali").iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Ali Can", "Bali Kaya", "Zeki Ali"]);
    }

    #[test]
    fn test_suggest_matches_code_email_phone() {
        let mut dir = directory();
        dir.create(CustomerInput {
            email: "gold@shop.tr".to_string(),
            phone: "5321234567".to_string(),
            ..named("Nur")
        })
        .unwrap();
        assert_eq!(dir.suggest("GOLD@").len(), 1);
        assert_eq!(dir.suggest("321234").len(), 1);
        assert_eq!(dir.suggest("c001").len(), 1);
        assert!(dir.suggest("nothing").is_empty());
    }

    #[test]
    fn test_suggest_empty_lists_first_ten_alphabetically() {
        let mut dir = directory();
        for i in (0..12).rev() {
            dir.create(named(&format!("Customer {:02}", i))).unwrap();
        }
        let all = dir.suggest("  ");
        assert_eq!(all.len(), 10);
        assert_eq!(all[0].name, "Customer 00");
        assert_eq!(all[9].name, "Customer 09");
    }

    // ==================== persistence / import / export tests ====================

    #[test]
    fn test_persists_and_reloads() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let storage = StorageConfig::default();
        {
            let mut dir = CustomerDirectory::open(store.clone(), &storage);
            dir.create(named("Kalıcı Müşteri")).unwrap();
        }
        let reopened = CustomerDirectory::open(store, &storage);
        assert!(reopened.find_by_name("kalıcı müşteri").is_some());
    }

    #[test]
    fn test_storage_full_keeps_in_memory_state() {
        let mut dir = CustomerDirectory::open(
            Arc::new(MemoryStore::with_quota(64)),
            &StorageConfig::default(),
        );
        let err = dir.create(named("A customer with a long enough record")).unwrap_err();
        assert_eq!(err.code(), ErrorCode::StorageFull);
        assert_eq!(dir.len(), 1);
    }

    #[test]
    fn test_import_json_envelope_skips_duplicates() {
        let mut dir = directory();
        dir.create(named("Ayşe")).unwrap();
        let json = r#"{"customers": [{"name": "ayşe"}, {"name": "Fatma"}, {"name": ""}]}"#;
        let report = dir.import_json(json).unwrap();
        assert_eq!(report, ImportReport { imported: 1, skipped: 2 });
        assert_eq!(dir.len(), 2);
    }

    #[test]
    fn test_export_json_round_trips_through_import() {
        let mut dir = directory();
        dir.create(named("Ayşe")).unwrap();
        dir.create(named("Fatma")).unwrap();
        let exported = dir.export_json().unwrap();

        let mut other = directory();
        let report = other.import_json(&exported).unwrap();
        assert_eq!(report.imported, 2);
    }

    #[test]
    fn test_export_csv() {
        let mut dir = directory();
        dir.create(CustomerInput {
            tags: vec!["vip".to_string()],
            address: Address {
                city: "Ankara".to_string(),
                ..Default::default()
            },
            ..named("Nur")
        })
        .unwrap();
        let csv = dir.export_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "\"Nur\",\"\",\"\",\"Ankara\",\"vip\",\"0\"");
    }

    #[test]
    fn test_statistics() {
        let mut dir = directory();
        dir.create(CustomerInput {
            email: "a@b.c".to_string(),
            ..named("With Email")
        })
        .unwrap();
        dir.create(named("Plain")).unwrap();
        let stats = dir.statistics();
        assert_eq!(stats.total_customers, 2);
        assert_eq!(stats.customers_with_email, 1);
        assert_eq!(stats.customers_with_phone, 0);
        assert_eq!(stats.recent_customers, 2);
    }
}
