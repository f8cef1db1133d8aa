use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use crate::clock::Clock;
use crate::config::OrderSettings;
use crate::domain::codec;
use crate::domain::errors::DomainError;
use crate::domain::order::{Order, OrderInput, Page, Receipt, StoredOrder, FIRST_DATA_ROW, HEADER};
use crate::domain::order_number;
use crate::domain::ports::RowStore;
use crate::domain::query::{self, PageRequest};
use crate::domain::retention::{self, SweepReport};

pub struct OrderService<S> {
    store: S,
    clock: Arc<dyn Clock>,
    settings: OrderSettings,
}

impl<S: RowStore> OrderService<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, settings: OrderSettings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now()
    }

    /// Validates and stores a JSON-encoded order, as received on the wire.
    pub fn submit_payload(
        &self,
        data: Option<&str>,
        sheet: Option<&str>,
    ) -> Result<Receipt, DomainError> {
        let data = data
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| DomainError::invalid("주문 데이터가 없습니다."))?;
        let payload: Value = serde_json::from_str(data).map_err(|e| {
            log::warn!("rejected order payload: {}", e);
            DomainError::invalid("주문 데이터 형식이 올바르지 않습니다.")
        })?;
        self.submit(&codec::decode(&payload), sheet)
    }

    pub fn submit(&self, input: &OrderInput, sheet: Option<&str>) -> Result<Receipt, DomainError> {
        let missing = input.missing_fields();
        if !missing.is_empty() {
            log::warn!("rejected order with missing fields: {:?}", missing);
            return Err(DomainError::invalid(format!(
                "{} 을(를) 입력해주세요.",
                missing.join(", ")
            )));
        }

        let sheet = self.sheet_name(sheet);
        let now = self.clock.now();
        let order_number = order_number::generate(&now, &mut rand::thread_rng());

        self.store.ensure_header(sheet, &HEADER)?;
        let row = self
            .store
            .append_row(sheet, codec::to_row(&order_number, input, &now))?;
        log::info!("order {} stored at row {} of '{}'", order_number, row, sheet);

        Ok(Receipt {
            order_number,
            order_time: now,
        })
    }

    /// Orders inside the configured listing window, most recent first.
    pub fn list_recent(
        &self,
        request: PageRequest,
        sheet: Option<&str>,
    ) -> Result<Page<Order>, DomainError> {
        let now = self.clock.now();
        let window = self.settings.listing_window.window(&now);
        let mut orders = query::filter_by_window(self.snapshot(self.sheet_name(sheet))?, &window);
        query::sort_descending(&mut orders);
        Ok(query::paginate(orders, request).map(|o| codec::encode(&o)))
    }

    /// Every order between two calendar dates (inclusive), most recent first.
    pub fn list_by_range(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
        sheet: Option<&str>,
    ) -> Result<Vec<Order>, DomainError> {
        let offset = self.offset();
        let start = codec::parse_date_bound(start_date, offset)?;
        let end = codec::parse_date_bound(end_date, offset)?;
        let window = query::range_window(start, end, offset)?;

        let mut orders = query::filter_by_window(self.snapshot(self.sheet_name(sheet))?, &window);
        query::sort_descending(&mut orders);
        Ok(orders.iter().map(codec::encode).collect())
    }

    /// Deletes orders older than the retention horizon.
    ///
    /// Never fails: errors are logged and the sheet is left as far as the
    /// sweep got.
    pub fn sweep_expired(&self, sheet: Option<&str>) -> SweepReport {
        let sheet = self.sheet_name(sheet);
        let mut report = SweepReport::default();
        match self.try_sweep(sheet, &mut report) {
            Ok(()) => log::info!(
                "retention sweep of '{}': examined {}, deleted {}, skipped {}",
                sheet,
                report.examined,
                report.deleted,
                report.skipped
            ),
            Err(e) => log::error!(
                "retention sweep of '{}' failed after deleting {} of {} rows: {}",
                sheet,
                report.deleted,
                report.expired,
                e
            ),
        }
        report
    }

    fn try_sweep(&self, sheet: &str, report: &mut SweepReport) -> Result<(), DomainError> {
        let horizon = retention::horizon(&self.clock.now(), self.settings.retention_days);
        let orders = self.snapshot(sheet)?;
        report.examined = orders.len();

        let targets = retention::deletion_order(retention::select_expired(&orders, &horizon));
        report.expired = targets.len();
        for position in targets {
            let cells = &orders[position - FIRST_DATA_ROW].cells;
            if self.store.delete_row(sheet, position, cells)? {
                report.deleted += 1;
            } else {
                log::debug!("row {} of '{}' changed before deletion", position, sheet);
                report.skipped += 1;
            }
        }
        Ok(())
    }

    /// Reads every data row of `sheet`, creating the sheet if needed.
    fn snapshot(&self, sheet: &str) -> Result<Vec<StoredOrder>, DomainError> {
        self.store.ensure_header(sheet, &HEADER)?;
        let last = self.store.last_row(sheet)?;
        if last < FIRST_DATA_ROW {
            return Ok(Vec::new());
        }

        let offset = self.offset();
        let rows = self
            .store
            .read_rows(sheet, FIRST_DATA_ROW, last - FIRST_DATA_ROW + 1)?;
        Ok(rows
            .into_iter()
            .enumerate()
            .map(|(i, cells)| codec::read_stored(FIRST_DATA_ROW + i, cells, offset))
            .collect())
    }

    fn sheet_name<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        requested
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.settings.orders_sheet.as_str())
    }

    fn offset(&self) -> FixedOffset {
        *self.clock.now().offset()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::Duration;
    use serde_json::json;

    use super::*;
    use crate::clock::FixedClock;
    use crate::domain::order_number::is_well_formed;
    use crate::domain::ports::Row;
    use crate::domain::query::ListingWindow;
    use crate::infrastructure::memory::InMemoryRowStore;

    const SHEET: &str = "주문목록";

    fn start() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-01-01T12:00:00+09:00").expect("valid")
    }

    fn service() -> (OrderService<InMemoryRowStore>, InMemoryRowStore, Arc<FixedClock>) {
        service_with(OrderSettings::default())
    }

    fn service_with(
        settings: OrderSettings,
    ) -> (OrderService<InMemoryRowStore>, InMemoryRowStore, Arc<FixedClock>) {
        let store = InMemoryRowStore::new();
        let clock = Arc::new(FixedClock::new(start()));
        let service = OrderService::new(store.clone(), clock.clone(), settings);
        (service, store, clock)
    }

    fn input(name: &str) -> OrderInput {
        OrderInput {
            depositor_name: name.to_string(),
            contact: "010-1234-5678".to_string(),
            product: "A".to_string(),
            address: "Seoul".to_string(),
            address_detail: String::new(),
        }
    }

    fn names(orders: &[Order]) -> Vec<&str> {
        orders.iter().map(|o| o.depositor_name.as_str()).collect()
    }

    #[test]
    fn submit_then_list_returns_the_new_order_first() {
        let (service, _, _) = service();
        let data = json!({
            "depositorName": "Kim",
            "contact": "010-1234-5678",
            "product": "A",
            "address": "Seoul",
            "addressDetail": ""
        })
        .to_string();

        let receipt = service.submit_payload(Some(&data), None).expect("submit failed");
        assert!(is_well_formed(&receipt.order_number));
        assert!(receipt.order_number.starts_with("ORD250101120000"));

        let page = service
            .list_recent(PageRequest::new(1, 10), None)
            .expect("list failed");
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items[0].order_number, receipt.order_number);
        assert_eq!(page.items[0].order_time, "2025-01-01T12:00:00.000+09:00");
        assert!(!page.has_more);
    }

    #[test]
    fn stored_row_follows_the_header_layout() {
        let (service, store, _) = service();
        let receipt = service.submit(&input("Kim"), None).expect("submit failed");

        let rows = store.rows(SHEET).expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], json!("주문번호"));
        assert_eq!(rows[1][0], json!(receipt.order_number));
        assert_eq!(rows[1][1], json!("Kim"));
        assert_eq!(rows[1].len(), HEADER.len());
    }

    #[test]
    fn missing_fields_are_named_in_order() {
        let (service, store, _) = service();
        let data = json!({ "product": "A", "addressDetail": "101" }).to_string();

        let err = service.submit_payload(Some(&data), None).expect_err("should fail");
        assert_eq!(err.to_string(), "입금자명, 연락처, 주소 을(를) 입력해주세요.");
        assert!(store.rows(SHEET).expect("rows").is_empty());
    }

    #[test]
    fn whitespace_only_fields_count_as_missing() {
        let (service, _, _) = service();
        let data = json!({
            "depositorName": "Kim",
            "contact": "   ",
            "product": "A",
            "address": "Seoul"
        })
        .to_string();
        let err = service.submit_payload(Some(&data), None).expect_err("should fail");
        assert_eq!(err.to_string(), "연락처 을(를) 입력해주세요.");
    }

    #[test]
    fn absent_or_malformed_payload_is_rejected() {
        let (service, _, _) = service();
        let err = service.submit_payload(None, None).expect_err("no data");
        assert_eq!(err.to_string(), "주문 데이터가 없습니다.");

        let err = service.submit_payload(Some("{not json"), None).expect_err("bad json");
        assert_eq!(err.to_string(), "주문 데이터 형식이 올바르지 않습니다.");
    }

    #[test]
    fn alternate_sheet_is_isolated() {
        let (service, store, _) = service();
        service.submit(&input("Kim"), Some("이벤트")).expect("submit failed");

        assert_eq!(store.rows("이벤트").expect("rows").len(), 2);
        let page = service
            .list_recent(PageRequest::default(), None)
            .expect("list failed");
        assert_eq!(page.total_count, 0);
        let page = service
            .list_recent(PageRequest::default(), Some("이벤트"))
            .expect("list failed");
        assert_eq!(page.total_count, 1);
    }

    #[test]
    fn listing_on_a_fresh_sheet_is_empty_and_creates_header() {
        let (service, store, _) = service();
        let page = service
            .list_recent(PageRequest::default(), None)
            .expect("list failed");
        assert!(page.items.is_empty());
        assert_eq!(page.total_count, 0);
        assert!(!page.has_more);
        assert_eq!(store.rows(SHEET).expect("rows").len(), 1);
    }

    #[test]
    fn listing_window_excludes_older_orders() {
        let (service, _, clock) = service();
        service.submit(&input("old"), None).expect("submit failed");
        clock.advance(Duration::days(5));
        service.submit(&input("new"), None).expect("submit failed");

        let page = service
            .list_recent(PageRequest::default(), None)
            .expect("list failed");
        assert_eq!(names(&page.items), vec!["new"]);
    }

    #[test]
    fn unbounded_listing_paginates_most_recent_first() {
        let (service, _, clock) = service_with(OrderSettings {
            listing_window: ListingWindow::All,
            ..OrderSettings::default()
        });
        for name in ["a", "b", "c", "d", "e"] {
            service.submit(&input(name), None).expect("submit failed");
            clock.advance(Duration::minutes(1));
        }

        let first = service
            .list_recent(PageRequest::new(1, 2), None)
            .expect("list failed");
        assert_eq!(names(&first.items), vec!["e", "d"]);
        assert_eq!(first.total_pages, 3);
        assert!(first.has_more);

        let last = service
            .list_recent(PageRequest::new(3, 2), None)
            .expect("list failed");
        assert_eq!(names(&last.items), vec!["a"]);
        assert!(!last.has_more);
    }

    #[test]
    fn rows_with_bad_time_are_invisible_to_queries() {
        let (service, store, _) = service();
        service.submit(&input("good"), None).expect("submit failed");
        store
            .append_row(
                SHEET,
                vec![
                    json!("ORD1"),
                    json!("bad"),
                    json!("010"),
                    json!("A"),
                    json!("Seoul"),
                    json!(""),
                    json!("not a date"),
                ],
            )
            .expect("append failed");

        let page = service
            .list_recent(PageRequest::default(), None)
            .expect("list failed");
        assert_eq!(names(&page.items), vec!["good"]);

        let all = service.list_by_range(None, None, None).expect("range failed");
        assert_eq!(names(&all), vec!["good"]);
    }

    #[test]
    fn range_export_is_inclusive_and_sorted() {
        let (service, _, clock) = service();
        clock.set(DateTime::parse_from_rfc3339("2025-01-01T00:00:00+09:00").expect("valid"));
        service.submit(&input("jan1"), None).expect("submit failed");
        clock.set(DateTime::parse_from_rfc3339("2025-01-02T23:59:59+09:00").expect("valid"));
        service.submit(&input("jan2"), None).expect("submit failed");
        clock.set(DateTime::parse_from_rfc3339("2025-01-03T00:00:00+09:00").expect("valid"));
        service.submit(&input("jan3"), None).expect("submit failed");

        let orders = service
            .list_by_range(Some("2025-01-01"), Some("2025-01-02"), None)
            .expect("range failed");
        assert_eq!(names(&orders), vec!["jan2", "jan1"]);

        let open_end = service
            .list_by_range(Some("2025-01-02"), Some(""), None)
            .expect("range failed");
        assert_eq!(names(&open_end), vec!["jan3", "jan2"]);
    }

    #[test]
    fn inverted_or_invalid_range_is_an_error() {
        let (service, _, _) = service();
        let err = service
            .list_by_range(Some("2025-01-05"), Some("2025-01-04"), None)
            .expect_err("inverted");
        assert_eq!(err.to_string(), "시작일이 종료일보다 늦을 수 없습니다.");

        let err = service
            .list_by_range(Some("yesterday"), None, None)
            .expect_err("invalid");
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[test]
    fn sweep_deletes_only_expired_rows_and_keeps_neighbours_intact() {
        let (service, store, clock) = service();
        let now = start();
        for (name, age) in [("ten", 10), ("six", 6), ("three", 3)] {
            clock.set(now - Duration::days(age));
            service.submit(&input(name), None).expect("submit failed");
        }
        clock.set(now);

        let report = service.sweep_expired(None);
        assert_eq!(
            report,
            SweepReport {
                examined: 3,
                expired: 1,
                deleted: 1,
                skipped: 0,
            }
        );

        let rows = store.rows(SHEET).expect("rows");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][1], json!("six"));
        assert_eq!(rows[2][1], json!("three"));
    }

    #[test]
    fn sweep_removes_interleaved_expired_rows() {
        let (service, store, clock) = service();
        let now = start();
        for (name, age) in [("a", 20), ("b", 1), ("c", 9), ("d", 2), ("e", 30)] {
            clock.set(now - Duration::days(age));
            service.submit(&input(name), None).expect("submit failed");
        }
        clock.set(now);

        assert_eq!(service.sweep_expired(None).deleted, 3);
        let rows = store.rows(SHEET).expect("rows");
        let kept: Vec<_> = rows[1..].iter().map(|r| r[1].clone()).collect();
        assert_eq!(kept, vec![json!("b"), json!("d")]);
    }

    #[test]
    fn sweep_is_idempotent() {
        let (service, _, clock) = service();
        clock.set(start() - Duration::days(10));
        service.submit(&input("old"), None).expect("submit failed");
        clock.set(start());

        assert_eq!(service.sweep_expired(None).deleted, 1);
        let again = service.sweep_expired(None);
        assert_eq!(again.deleted, 0);
        assert_eq!(again.examined, 0);
    }

    struct FailingDeletes(InMemoryRowStore);

    impl RowStore for FailingDeletes {
        fn ensure_header(&self, sheet: &str, header: &[&str]) -> Result<(), DomainError> {
            self.0.ensure_header(sheet, header)
        }
        fn append_row(&self, sheet: &str, cells: Row) -> Result<usize, DomainError> {
            self.0.append_row(sheet, cells)
        }
        fn last_row(&self, sheet: &str) -> Result<usize, DomainError> {
            self.0.last_row(sheet)
        }
        fn read_rows(
            &self,
            sheet: &str,
            start_row: usize,
            num_rows: usize,
        ) -> Result<Vec<Row>, DomainError> {
            self.0.read_rows(sheet, start_row, num_rows)
        }
        fn delete_row(
            &self,
            _sheet: &str,
            _row: usize,
            _expected: &[Value],
        ) -> Result<bool, DomainError> {
            Err(DomainError::Storage("sheet is read-only".to_string()))
        }
    }

    /// Runs `before_first_delete` once, ahead of the first delete it forwards.
    struct InterleavedDeletes {
        inner: InMemoryRowStore,
        before_first_delete: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    }

    impl RowStore for InterleavedDeletes {
        fn ensure_header(&self, sheet: &str, header: &[&str]) -> Result<(), DomainError> {
            self.inner.ensure_header(sheet, header)
        }
        fn append_row(&self, sheet: &str, cells: Row) -> Result<usize, DomainError> {
            self.inner.append_row(sheet, cells)
        }
        fn last_row(&self, sheet: &str) -> Result<usize, DomainError> {
            self.inner.last_row(sheet)
        }
        fn read_rows(
            &self,
            sheet: &str,
            start_row: usize,
            num_rows: usize,
        ) -> Result<Vec<Row>, DomainError> {
            self.inner.read_rows(sheet, start_row, num_rows)
        }
        fn delete_row(
            &self,
            sheet: &str,
            row: usize,
            expected: &[Value],
        ) -> Result<bool, DomainError> {
            let hook = self.before_first_delete.lock().expect("poisoned").take();
            if let Some(hook) = hook {
                hook();
            }
            self.inner.delete_row(sheet, row, expected)
        }
    }

    #[test]
    fn overlapping_sweeps_never_delete_live_rows() {
        let (writer, store, clock) = service();
        let now = start();
        for (name, age) in [("old1", 20), ("old2", 15), ("keep1", 1), ("keep2", 2)] {
            clock.set(now - Duration::days(age));
            writer.submit(&input(name), None).expect("submit failed");
        }
        clock.set(now);

        let rival = OrderService::new(store.clone(), clock.clone(), OrderSettings::default());
        let rival_report = Arc::new(Mutex::new(SweepReport::default()));
        let rival_out = rival_report.clone();
        let interleaved = InterleavedDeletes {
            inner: store.clone(),
            before_first_delete: Mutex::new(Some(Box::new(move || {
                *rival_out.lock().expect("poisoned") = rival.sweep_expired(None);
            }))),
        };
        let service = OrderService::new(interleaved, clock.clone(), OrderSettings::default());

        let report = service.sweep_expired(None);
        let rival_report = *rival_report.lock().expect("poisoned");
        assert_eq!(rival_report.deleted, 2);
        assert_eq!(report.expired, 2);
        assert_eq!(report.deleted, 0);
        assert_eq!(report.skipped, 2);

        let rows = store.rows(SHEET).expect("rows");
        let kept: Vec<_> = rows[1..].iter().map(|r| r[1].clone()).collect();
        assert_eq!(kept, vec![json!("keep1"), json!("keep2")]);
    }

    #[test]
    fn sweep_failure_is_swallowed() {
        let store = InMemoryRowStore::new();
        let clock = Arc::new(FixedClock::new(start() - Duration::days(10)));
        let service = OrderService::new(
            FailingDeletes(store.clone()),
            clock.clone(),
            OrderSettings::default(),
        );
        service.submit(&input("old"), None).expect("submit failed");
        clock.set(start());

        let report = service.sweep_expired(None);
        assert_eq!(report.expired, 1);
        assert_eq!(report.deleted, 0);
        assert_eq!(store.rows(SHEET).expect("rows").len(), 2);
    }
}
