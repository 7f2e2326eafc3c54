pub mod request_id_mw;
