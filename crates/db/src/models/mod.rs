pub mod media_record;
