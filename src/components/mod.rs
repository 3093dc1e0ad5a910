// External collaborators of the booking pipelines
pub mod google_calendar;
pub mod portal;

pub use google_calendar::{CalendarService, GoogleCalendarClient};
pub use portal::{BookingPortal, SlotLookup, WebDriverPortal};
