pub mod form_date;
