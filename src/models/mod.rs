pub mod charged_slab;
