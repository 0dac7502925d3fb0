pub mod fragment;
