pub mod homologation;
