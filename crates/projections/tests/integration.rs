//! Integration tests: BookingService commands → ProjectionProcessor → views.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use common::{BookingId, CustomerId, ServiceId, StaffId};
use domain::{
    Actor, AssignStaff, BookingRequest, BookingService, BookingStatus, CancelBooking,
    CompleteBooking, ConfirmBooking, InMemoryCatalog, InMemoryPetDirectory, Money, PetInfo,
    PricingTier, RequestBooking, Service, StartService,
};
use journal::InMemoryJournal;
use projections::{
    BoardFilter, BookingBoardView, CustomerBookingsView, ProjectionProcessor, ReadModel,
};
use scheduling::{FixedClock, InMemoryLedger};

type Svc = BookingService<InMemoryJournal, InMemoryLedger>;

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 5, 10).unwrap()
}

fn at(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
}

struct Setup {
    service: Svc,
    service_id: ServiceId,
    processor: ProjectionProcessor<InMemoryJournal>,
    board: BookingBoardView,
    customers: CustomerBookingsView,
}

async fn setup() -> Setup {
    let journal = InMemoryJournal::new();
    let catalog = InMemoryCatalog::new();
    let service_id = catalog
        .add(
            Service::new("Bath & Brush", 60)
                .tier(PricingTier::new("Small", 0.0, 10.0, Money::from_dollars(25)))
                .tier(PricingTier::new("Large", 10.01, 45.0, Money::from_dollars(45))),
        )
        .await;
    let clock = FixedClock::at(NaiveDate::from_ymd_opt(2030, 5, 9).unwrap(), at(9));
    let service = BookingService::new(
        journal.clone(),
        InMemoryLedger::new(),
        Arc::new(catalog),
        Arc::new(InMemoryPetDirectory::new()),
    )
    .with_clock(Arc::new(clock));

    let board = BookingBoardView::new();
    let customers = CustomerBookingsView::new();
    let mut processor = ProjectionProcessor::new(journal);
    processor.register(Box::new(board.clone()));
    processor.register(Box::new(customers.clone()));

    Setup {
        service,
        service_id,
        processor,
        board,
        customers,
    }
}

fn request(service_id: ServiceId, hour: u32, guest: bool) -> BookingRequest {
    let (name, phone) = if guest {
        (Some("Ana".to_string()), Some("555-0100".to_string()))
    } else {
        (None, None)
    };
    BookingRequest {
        service_id,
        date: day(),
        start: at(hour),
        pet_id: None,
        pet_info: Some(PetInfo {
            name: Some("Biscuit".into()),
            pet_type: Some("DOG".into()),
            breed: None,
            weight: Some(8.0),
        }),
        customer_note: None,
        customer_name: name,
        customer_phone: phone,
        customer_email: None,
    }
}

async fn book(s: &Setup, actor: Actor, hour: u32) -> BookingId {
    let guest = matches!(actor, Actor::Guest);
    let cmd = RequestBooking::new(actor, request(s.service_id, hour, guest));
    let id = cmd.booking_id;
    s.service.create(cmd).await.unwrap();
    id
}

#[tokio::test]
async fn full_lifecycle_reaches_the_board() {
    let s = setup().await;
    let staff = Actor::Staff(StaffId::new());
    let groomer = StaffId::new();

    let id = book(&s, Actor::Guest, 10).await;
    s.service
        .confirm(ConfirmBooking::new(id, staff.clone()))
        .await
        .unwrap();
    s.service
        .assign_staff(AssignStaff::new(id, staff.clone(), groomer))
        .await
        .unwrap();
    s.service
        .start(StartService::new(id, staff.clone()))
        .await
        .unwrap();
    s.service
        .complete(CompleteBooking::new(id, staff.clone()).with_note("Nails trimmed"))
        .await
        .unwrap();

    s.processor.run_catch_up().await.unwrap();

    let row = s.board.get(id).await.unwrap();
    assert_eq!(row.status, BookingStatus::Completed);
    assert_eq!(row.staff_id, Some(groomer));
    assert_eq!(row.price, Money::from_dollars(25));
    assert_eq!(ReadModel::count(&s.board), 1);
}

#[tokio::test]
async fn customer_sees_only_their_bookings() {
    let s = setup().await;
    let alice = CustomerId::new();
    let bob = CustomerId::new();

    let first = book(&s, Actor::Customer(alice), 9).await;
    let second = book(&s, Actor::Customer(alice), 14).await;
    book(&s, Actor::Customer(bob), 11).await;
    book(&s, Actor::Guest, 16).await;

    s.processor.run_catch_up().await.unwrap();

    let mine: Vec<_> = s
        .customers
        .bookings(alice)
        .await
        .into_iter()
        .map(|r| r.booking_id)
        .collect();
    assert_eq!(mine, vec![second, first]);
    assert_eq!(s.board.list(BoardFilter::default()).await.len(), 4);
}

#[tokio::test]
async fn board_filters_reflect_transitions() {
    let s = setup().await;
    let staff = Actor::Staff(StaffId::new());

    let kept = book(&s, Actor::Guest, 9).await;
    let dropped = book(&s, Actor::Guest, 12).await;
    s.service
        .confirm(ConfirmBooking::new(kept, staff.clone()))
        .await
        .unwrap();
    s.service
        .cancel(CancelBooking::new(dropped, staff.clone(), "Owner called"))
        .await
        .unwrap();

    s.processor.run_catch_up().await.unwrap();

    let confirmed = s
        .board
        .list(BoardFilter {
            status: Some(BookingStatus::Confirmed),
            date: Some(day()),
        })
        .await;
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].booking_id, kept);

    let cancelled = s
        .board
        .list(BoardFilter {
            status: Some(BookingStatus::Cancelled),
            date: None,
        })
        .await;
    assert_eq!(cancelled[0].booking_id, dropped);
}

#[tokio::test]
async fn incremental_catch_up_picks_up_new_entries() {
    let s = setup().await;
    let staff = Actor::Staff(StaffId::new());

    let id = book(&s, Actor::Guest, 10).await;
    s.processor.run_catch_up().await.unwrap();
    assert_eq!(s.board.get(id).await.unwrap().status, BookingStatus::Pending);

    s.service
        .confirm(ConfirmBooking::new(id, staff))
        .await
        .unwrap();
    s.processor.run_catch_up().await.unwrap();

    assert_eq!(
        s.board.get(id).await.unwrap().status,
        BookingStatus::Confirmed
    );
}

#[tokio::test]
async fn rebuild_reproduces_the_same_views() {
    let s = setup().await;
    let alice = CustomerId::new();
    for hour in [9, 11, 13] {
        book(&s, Actor::Customer(alice), hour).await;
    }
    s.processor.run_catch_up().await.unwrap();
    let before = s.customers.bookings(alice).await.len();

    s.processor.rebuild_all().await.unwrap();

    assert_eq!(s.customers.bookings(alice).await.len(), before);
    assert_eq!(ReadModel::count(&s.board), 3);
}
