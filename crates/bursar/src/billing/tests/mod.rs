mod common;
mod delinquency;
