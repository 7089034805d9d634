mod helpers;
mod orders;
mod riders;
