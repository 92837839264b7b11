pub mod city_selection;
pub mod result_model;
